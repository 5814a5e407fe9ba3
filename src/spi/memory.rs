use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::CmisError;
use crate::model::{
    Acl, AclEntry, BaseTypeId, ContentStream, Id, ObjectData, ObjectFactory, PropertyDefinition,
    PropertyType, RepositoryInfo, TypeDefinition,
};
use crate::spi::{
    AclCapability, DiscoveryCapability, MultiFilingCapability, NavigationCapability,
    ObjectCapability, PolicyCapability, ProviderSession, RelationshipCapability,
    RepositoryCapability, VersioningCapability,
};

const SYSTEM_USER: &str = "system";

struct RepositoryState {
    info: RepositoryInfo,
    types: HashMap<Id, TypeDefinition>,
    objects: HashMap<Id, ObjectData>,
    contents: HashMap<Id, ContentStream>,
    secured: HashSet<Id>,
    acls: HashMap<Id, Acl>,
    /// Extra parent folders from multi-filing, object id -> folder ids.
    filed: HashMap<Id, HashSet<Id>>,
    /// Applied policies, object id -> policy object ids.
    policies: HashMap<Id, HashSet<Id>>,
}

struct MemoryState {
    repositories: RwLock<HashMap<Id, RepositoryState>>,
    factory: ObjectFactory,
}

/// In-memory service provider with seeded demo content. Backs the binary
/// and the test suite; not a persistence engine.
pub struct InMemoryProvider {
    state: Arc<MemoryState>,
    clear_all_calls: AtomicUsize,
    cleared_repositories: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl InMemoryProvider {
    /// Creates a provider with one seeded repository. Seed ids are
    /// deterministic so tests can address the content directly: the root
    /// folder is `root`, `folder-reports` holds `doc-q3`, `doc-readme`
    /// carries text content and `doc-secret` denies access.
    pub fn with_sample_content(repository_id: &str) -> Self {
        let state = MemoryState {
            repositories: RwLock::new(HashMap::new()),
            factory: ObjectFactory,
        };
        let provider = Self {
            state: Arc::new(state),
            clear_all_calls: AtomicUsize::new(0),
            cleared_repositories: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        };
        provider
            .state
            .repositories
            .write()
            .insert(repository_id.to_string(), seed_repository(repository_id));
        provider
    }

    pub fn clear_all_calls(&self) -> usize {
        self.clear_all_calls.load(Ordering::SeqCst)
    }

    pub fn cleared_repositories(&self) -> Vec<String> {
        self.cleared_repositories.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn seed_repository(repository_id: &str) -> RepositoryState {
    let info = RepositoryInfo {
        id: repository_id.to_string(),
        name: format!("{} (in-memory)", repository_id),
        description: Some("Seeded in-memory repository".to_string()),
        vendor_name: "cmis-gateway".to_string(),
        product_name: "InMemoryProvider".to_string(),
        product_version: env!("CARGO_PKG_VERSION").to_string(),
        root_folder_id: "root".to_string(),
        cmis_version_supported: "1.0".to_string(),
    };

    let mut types = HashMap::new();
    types.insert("cmis:document".to_string(), document_type());
    types.insert("cmis:folder".to_string(), folder_type());

    let mut objects = HashMap::new();
    objects.insert("root".to_string(), seed_folder("root", "root", None));
    objects.insert(
        "folder-reports".to_string(),
        seed_folder("folder-reports", "reports", Some("root")),
    );
    objects.insert(
        "doc-readme".to_string(),
        seed_document("doc-readme", "readme.txt", "root"),
    );
    objects.insert(
        "doc-secret".to_string(),
        seed_document("doc-secret", "secret.txt", "root"),
    );
    objects.insert(
        "doc-q3".to_string(),
        seed_document("doc-q3", "q3.txt", "folder-reports"),
    );

    let mut contents = HashMap::new();
    contents.insert(
        "doc-readme".to_string(),
        ContentStream::new("readme.txt", "text/plain", b"Hello CMIS".to_vec()),
    );

    let mut secured = HashSet::new();
    secured.insert("doc-secret".to_string());

    RepositoryState {
        info,
        types,
        objects,
        contents,
        secured,
        acls: HashMap::new(),
        filed: HashMap::new(),
        policies: HashMap::new(),
    }
}

fn base_properties() -> HashMap<Id, PropertyDefinition> {
    let mut properties = HashMap::new();
    for (id, property_type) in [
        ("cmis:objectId", PropertyType::Id),
        ("cmis:name", PropertyType::String),
        ("cmis:createdBy", PropertyType::String),
        ("cmis:creationDate", PropertyType::DateTime),
    ] {
        properties.insert(id.to_string(), PropertyDefinition::new(id, id, property_type));
    }
    properties
}

fn document_type() -> TypeDefinition {
    let mut properties = base_properties();
    properties.insert(
        "cmis:contentStreamLength".to_string(),
        PropertyDefinition::new(
            "cmis:contentStreamLength",
            "cmis:contentStreamLength",
            PropertyType::Integer,
        ),
    );
    properties.insert(
        "cmis:contentStreamMimeType".to_string(),
        PropertyDefinition::new(
            "cmis:contentStreamMimeType",
            "cmis:contentStreamMimeType",
            PropertyType::String,
        ),
    );
    TypeDefinition {
        id: "cmis:document".to_string(),
        query_name: "cmis:document".to_string(),
        display_name: "Document".to_string(),
        base_id: BaseTypeId::Document,
        parent_id: None,
        properties,
    }
}

fn folder_type() -> TypeDefinition {
    let mut properties = base_properties();
    properties.insert(
        "cmis:parentId".to_string(),
        PropertyDefinition::new("cmis:parentId", "cmis:parentId", PropertyType::Id),
    );
    TypeDefinition {
        id: "cmis:folder".to_string(),
        query_name: "cmis:folder".to_string(),
        display_name: "Folder".to_string(),
        base_id: BaseTypeId::Folder,
        parent_id: None,
        properties,
    }
}

fn seed_folder(id: &str, name: &str, parent_id: Option<&str>) -> ObjectData {
    let now = Utc::now();
    ObjectData {
        id: id.to_string(),
        type_id: "cmis:folder".to_string(),
        base_type_id: BaseTypeId::Folder,
        name: name.to_string(),
        parent_id: parent_id.map(str::to_string),
        properties: HashMap::new(),
        change_token: format!("seed-{}", id),
        created_by: SYSTEM_USER.to_string(),
        created_at: now,
        updated_by: SYSTEM_USER.to_string(),
        updated_at: now,
    }
}

fn seed_document(id: &str, name: &str, parent_id: &str) -> ObjectData {
    let now = Utc::now();
    ObjectData {
        id: id.to_string(),
        type_id: "cmis:document".to_string(),
        base_type_id: BaseTypeId::Document,
        name: name.to_string(),
        parent_id: Some(parent_id.to_string()),
        properties: HashMap::new(),
        change_token: format!("seed-{}", id),
        created_by: SYSTEM_USER.to_string(),
        created_at: now,
        updated_by: SYSTEM_USER.to_string(),
        updated_at: now,
    }
}

impl MemoryState {
    fn with_repository<T>(
        &self,
        repository_id: &str,
        f: impl FnOnce(&RepositoryState) -> Result<T, CmisError>,
    ) -> Result<T, CmisError> {
        let repositories = self.repositories.read();
        let repo = repositories
            .get(repository_id)
            .ok_or_else(|| CmisError::object_not_found(format!("Unknown repository: {}", repository_id)))?;
        f(repo)
    }

    fn with_repository_mut<T>(
        &self,
        repository_id: &str,
        f: impl FnOnce(&ObjectFactory, &mut RepositoryState) -> Result<T, CmisError>,
    ) -> Result<T, CmisError> {
        let mut repositories = self.repositories.write();
        let repo = repositories
            .get_mut(repository_id)
            .ok_or_else(|| CmisError::object_not_found(format!("Unknown repository: {}", repository_id)))?;
        f(&self.factory, repo)
    }
}

impl RepositoryState {
    fn object(&self, object_id: &str) -> Result<&ObjectData, CmisError> {
        if self.secured.contains(object_id) {
            return Err(CmisError::permission_denied(format!(
                "Access denied to object: {}",
                object_id
            )));
        }
        self.objects
            .get(object_id)
            .ok_or_else(|| CmisError::object_not_found(format!("Object not found: {}", object_id)))
    }

    fn folder(&self, folder_id: &str) -> Result<&ObjectData, CmisError> {
        let folder = self.object(folder_id)?;
        if folder.base_type_id != BaseTypeId::Folder {
            return Err(CmisError::invalid_argument(format!(
                "Object is not a folder: {}",
                folder_id
            )));
        }
        Ok(folder)
    }

    fn children_of(&self, folder_id: &str) -> Vec<ObjectData> {
        let mut children: Vec<ObjectData> = self
            .objects
            .values()
            .filter(|o| {
                o.parent_id.as_deref() == Some(folder_id)
                    || self
                        .filed
                        .get(&o.id)
                        .is_some_and(|folders| folders.contains(folder_id))
            })
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    fn descendants_of(&self, folder_id: &str, depth: i64, folders_only: bool) -> Vec<ObjectData> {
        if depth == 0 {
            return Vec::new();
        }
        let mut result = Vec::new();
        for child in self.children_of(folder_id) {
            let is_folder = child.base_type_id == BaseTypeId::Folder;
            if !folders_only || is_folder {
                result.push(child.clone());
            }
            if is_folder {
                let next_depth = if depth < 0 { depth } else { depth - 1 };
                result.extend(self.descendants_of(&child.id, next_depth, folders_only));
            }
        }
        result
    }

    fn name_in_use(&self, folder_id: &str, name: &str) -> bool {
        self.children_of(folder_id).iter().any(|c| c.name == name)
    }
}

fn property_string(
    properties: &HashMap<String, serde_json::Value>,
    key: &str,
) -> Option<String> {
    properties.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn check_depth(depth: i64) -> Result<(), CmisError> {
    if depth == 0 || depth < -1 {
        return Err(CmisError::invalid_argument("Depth must be -1 or positive"));
    }
    Ok(())
}

#[async_trait]
impl RepositoryCapability for MemoryState {
    async fn get_repository_infos(&self) -> Result<Vec<RepositoryInfo>, CmisError> {
        let repositories = self.repositories.read();
        let mut infos: Vec<RepositoryInfo> =
            repositories.values().map(|r| r.info.clone()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(infos)
    }

    async fn get_repository_info(&self, repository_id: &str) -> Result<RepositoryInfo, CmisError> {
        self.with_repository(repository_id, |repo| Ok(repo.info.clone()))
    }

    async fn get_type_definition(
        &self,
        repository_id: &str,
        type_id: &str,
    ) -> Result<TypeDefinition, CmisError> {
        self.with_repository(repository_id, |repo| {
            repo.types
                .get(type_id)
                .cloned()
                .ok_or_else(|| CmisError::object_not_found(format!("Type not found: {}", type_id)))
        })
    }

    async fn get_type_children(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
    ) -> Result<Vec<TypeDefinition>, CmisError> {
        self.with_repository(repository_id, |repo| {
            if let Some(type_id) = type_id {
                if !repo.types.contains_key(type_id) {
                    return Err(CmisError::object_not_found(format!(
                        "Type not found: {}",
                        type_id
                    )));
                }
            }
            let mut types: Vec<TypeDefinition> = repo
                .types
                .values()
                .filter(|t| t.parent_id.as_deref() == type_id)
                .cloned()
                .collect();
            types.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(types)
        })
    }

    async fn get_type_descendants(
        &self,
        repository_id: &str,
        type_id: Option<&str>,
        depth: i64,
    ) -> Result<Vec<TypeDefinition>, CmisError> {
        check_depth(depth)?;
        // The seeded type hierarchy is flat, so descendants equal children.
        self.get_type_children(repository_id, type_id).await
    }
}

#[async_trait]
impl NavigationCapability for MemoryState {
    async fn get_children(
        &self,
        repository_id: &str,
        folder_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError> {
        self.with_repository(repository_id, |repo| {
            repo.folder(folder_id)?;
            Ok(repo.children_of(folder_id))
        })
    }

    async fn get_descendants(
        &self,
        repository_id: &str,
        folder_id: &str,
        depth: i64,
    ) -> Result<Vec<ObjectData>, CmisError> {
        check_depth(depth)?;
        self.with_repository(repository_id, |repo| {
            repo.folder(folder_id)?;
            Ok(repo.descendants_of(folder_id, depth, false))
        })
    }

    async fn get_folder_tree(
        &self,
        repository_id: &str,
        folder_id: &str,
        depth: i64,
    ) -> Result<Vec<ObjectData>, CmisError> {
        check_depth(depth)?;
        self.with_repository(repository_id, |repo| {
            repo.folder(folder_id)?;
            Ok(repo.descendants_of(folder_id, depth, true))
        })
    }

    async fn get_object_parents(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError> {
        self.with_repository(repository_id, |repo| {
            let object = repo.object(object_id)?;
            let mut parent_ids: Vec<&str> = Vec::new();
            if let Some(parent) = object.parent_id.as_deref() {
                parent_ids.push(parent);
            }
            if let Some(folders) = repo.filed.get(object_id) {
                parent_ids.extend(folders.iter().map(String::as_str));
            }
            let mut parents = Vec::new();
            for id in parent_ids {
                parents.push(repo.object(id)?.clone());
            }
            parents.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(parents)
        })
    }
}

#[async_trait]
impl ObjectCapability for MemoryState {
    async fn get_object(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<ObjectData, CmisError> {
        self.with_repository(repository_id, |repo| repo.object(object_id).cloned())
    }

    async fn get_content_stream(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<ContentStream, CmisError> {
        self.with_repository(repository_id, |repo| {
            let object = repo.object(object_id)?;
            if object.base_type_id != BaseTypeId::Document {
                return Err(CmisError::stream_not_supported(format!(
                    "Object has no content stream: {}",
                    object_id
                )));
            }
            repo.contents
                .get(object_id)
                .cloned()
                .ok_or_else(|| CmisError::constraint(format!("Document has no content: {}", object_id)))
        })
    }

    async fn create_document(
        &self,
        repository_id: &str,
        properties: HashMap<String, serde_json::Value>,
        folder_id: Option<&str>,
        content: Option<ContentStream>,
    ) -> Result<ObjectData, CmisError> {
        self.with_repository_mut(repository_id, |factory, repo| {
            let name = property_string(&properties, "cmis:name")
                .ok_or_else(|| CmisError::invalid_argument("Property cmis:name must be set"))?;
            let type_id = property_string(&properties, "cmis:objectTypeId")
                .unwrap_or_else(|| "cmis:document".to_string());
            match repo.types.get(&type_id) {
                Some(def) if def.base_id == BaseTypeId::Document => {}
                Some(_) => {
                    return Err(CmisError::invalid_argument(format!(
                        "Type is not a document type: {}",
                        type_id
                    )))
                }
                None => {
                    return Err(CmisError::invalid_argument(format!(
                        "Unknown type: {}",
                        type_id
                    )))
                }
            }
            if let Some(folder_id) = folder_id {
                repo.folder(folder_id)?;
                if repo.name_in_use(folder_id, &name) {
                    return Err(CmisError::name_constraint(format!(
                        "An object named '{}' already exists in folder {}",
                        name, folder_id
                    )));
                }
            }
            let document =
                factory.new_document(&type_id, &name, folder_id, SYSTEM_USER, properties);
            if let Some(content) = content {
                repo.contents.insert(document.id.clone(), content);
            }
            repo.objects.insert(document.id.clone(), document.clone());
            Ok(document)
        })
    }

    async fn create_folder(
        &self,
        repository_id: &str,
        properties: HashMap<String, serde_json::Value>,
        folder_id: &str,
    ) -> Result<ObjectData, CmisError> {
        self.with_repository_mut(repository_id, |factory, repo| {
            let name = property_string(&properties, "cmis:name")
                .ok_or_else(|| CmisError::invalid_argument("Property cmis:name must be set"))?;
            repo.folder(folder_id)?;
            if repo.name_in_use(folder_id, &name) {
                return Err(CmisError::name_constraint(format!(
                    "An object named '{}' already exists in folder {}",
                    name, folder_id
                )));
            }
            let folder = factory.new_folder("cmis:folder", &name, folder_id, SYSTEM_USER, properties);
            repo.objects.insert(folder.id.clone(), folder.clone());
            Ok(folder)
        })
    }

    async fn set_content_stream(
        &self,
        repository_id: &str,
        object_id: &str,
        content: ContentStream,
        overwrite: bool,
    ) -> Result<ObjectData, CmisError> {
        self.with_repository_mut(repository_id, |_, repo| {
            let base_type = repo.object(object_id)?.base_type_id;
            if base_type != BaseTypeId::Document {
                return Err(CmisError::stream_not_supported(format!(
                    "Object cannot carry content: {}",
                    object_id
                )));
            }
            if !overwrite && repo.contents.contains_key(object_id) {
                return Err(CmisError::content_already_exists(format!(
                    "Document already has content: {}",
                    object_id
                )));
            }
            repo.contents.insert(object_id.to_string(), content);
            let object = repo
                .objects
                .get_mut(object_id)
                .ok_or_else(|| CmisError::object_not_found(format!("Object not found: {}", object_id)))?;
            object.change_token = crate::model::generate_id();
            object.updated_by = SYSTEM_USER.to_string();
            object.updated_at = Utc::now();
            Ok(object.clone())
        })
    }

    async fn delete_object(&self, repository_id: &str, object_id: &str) -> Result<(), CmisError> {
        self.with_repository_mut(repository_id, |_, repo| {
            let object = repo.object(object_id)?;
            if object.base_type_id == BaseTypeId::Folder {
                if object_id == repo.info.root_folder_id {
                    return Err(CmisError::constraint("Root folder cannot be deleted"));
                }
                if !repo.children_of(object_id).is_empty() {
                    return Err(CmisError::constraint(format!(
                        "Folder is not empty: {}",
                        object_id
                    )));
                }
            }
            repo.objects.remove(object_id);
            repo.contents.remove(object_id);
            repo.filed.remove(object_id);
            repo.policies.remove(object_id);
            Ok(())
        })
    }

    async fn delete_tree(
        &self,
        repository_id: &str,
        folder_id: &str,
    ) -> Result<Vec<Id>, CmisError> {
        self.with_repository_mut(repository_id, |_, repo| {
            repo.folder(folder_id)?;
            if folder_id == repo.info.root_folder_id {
                return Err(CmisError::constraint("Root folder cannot be deleted"));
            }
            let mut removed: Vec<Id> = repo
                .descendants_of(folder_id, -1, false)
                .into_iter()
                .map(|o| o.id)
                .collect();
            removed.push(folder_id.to_string());
            for id in &removed {
                repo.objects.remove(id);
                repo.contents.remove(id);
                repo.filed.remove(id);
                repo.policies.remove(id);
            }
            Ok(removed)
        })
    }
}

#[async_trait]
impl DiscoveryCapability for MemoryState {
    async fn query(
        &self,
        repository_id: &str,
        _statement: &str,
    ) -> Result<Vec<ObjectData>, CmisError> {
        self.with_repository(repository_id, |_| {
            Err(CmisError::not_supported(
                "Query is not supported by this provider",
            ))
        })
    }
}

#[async_trait]
impl RelationshipCapability for MemoryState {
    async fn get_object_relationships(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError> {
        self.with_repository(repository_id, |repo| {
            repo.object(object_id)?;
            // No relationship objects in the seeded content.
            Ok(Vec::new())
        })
    }
}

#[async_trait]
impl VersioningCapability for MemoryState {
    async fn get_all_versions(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError> {
        self.with_repository(repository_id, |repo| {
            let object = repo.object(object_id)?;
            if object.base_type_id != BaseTypeId::Document {
                return Err(CmisError::invalid_argument(format!(
                    "Object is not a document: {}",
                    object_id
                )));
            }
            // Single-version store: every document is its own latest version.
            Ok(vec![object.clone()])
        })
    }
}

#[async_trait]
impl AclCapability for MemoryState {
    async fn get_acl(&self, repository_id: &str, object_id: &str) -> Result<Acl, CmisError> {
        self.with_repository(repository_id, |repo| {
            let object = repo.object(object_id)?;
            if let Some(acl) = repo.acls.get(object_id) {
                return Ok(acl.clone());
            }
            Ok(Acl {
                entries: vec![AclEntry {
                    principal: object.created_by.clone(),
                    permissions: vec!["cmis:all".to_string()],
                }],
            })
        })
    }

    async fn apply_acl(
        &self,
        repository_id: &str,
        object_id: &str,
        acl: Acl,
    ) -> Result<Acl, CmisError> {
        self.with_repository_mut(repository_id, |_, repo| {
            repo.object(object_id)?;
            repo.acls.insert(object_id.to_string(), acl.clone());
            Ok(acl)
        })
    }
}

#[async_trait]
impl MultiFilingCapability for MemoryState {
    async fn add_object_to_folder(
        &self,
        repository_id: &str,
        object_id: &str,
        folder_id: &str,
    ) -> Result<(), CmisError> {
        self.with_repository_mut(repository_id, |_, repo| {
            let object = repo.object(object_id)?;
            if object.base_type_id != BaseTypeId::Document {
                return Err(CmisError::not_supported(
                    "Only documents can be multi-filed",
                ));
            }
            repo.folder(folder_id)?;
            let already_primary = object.parent_id.as_deref() == Some(folder_id);
            let filed = repo.filed.entry(object_id.to_string()).or_default();
            if already_primary || !filed.insert(folder_id.to_string()) {
                return Err(CmisError::content_already_exists(format!(
                    "Object {} is already filed in folder {}",
                    object_id, folder_id
                )));
            }
            Ok(())
        })
    }

    async fn remove_object_from_folder(
        &self,
        repository_id: &str,
        object_id: &str,
        folder_id: &str,
    ) -> Result<(), CmisError> {
        self.with_repository_mut(repository_id, |_, repo| {
            repo.object(object_id)?;
            let removed = repo
                .filed
                .get_mut(object_id)
                .is_some_and(|folders| folders.remove(folder_id));
            if !removed {
                return Err(CmisError::invalid_argument(format!(
                    "Object {} is not filed in folder {}",
                    object_id, folder_id
                )));
            }
            Ok(())
        })
    }
}

#[async_trait]
impl PolicyCapability for MemoryState {
    async fn apply_policy(
        &self,
        repository_id: &str,
        policy_id: &str,
        object_id: &str,
    ) -> Result<(), CmisError> {
        self.with_repository_mut(repository_id, |_, repo| {
            repo.object(object_id)?;
            repo.object(policy_id)?;
            repo.policies
                .entry(object_id.to_string())
                .or_default()
                .insert(policy_id.to_string());
            Ok(())
        })
    }

    async fn remove_policy(
        &self,
        repository_id: &str,
        policy_id: &str,
        object_id: &str,
    ) -> Result<(), CmisError> {
        self.with_repository_mut(repository_id, |_, repo| {
            repo.object(object_id)?;
            let removed = repo
                .policies
                .get_mut(object_id)
                .is_some_and(|policies| policies.remove(policy_id));
            if !removed {
                return Err(CmisError::invalid_argument(format!(
                    "Policy {} is not applied to object {}",
                    policy_id, object_id
                )));
            }
            Ok(())
        })
    }

    async fn get_applied_policies(
        &self,
        repository_id: &str,
        object_id: &str,
    ) -> Result<Vec<ObjectData>, CmisError> {
        self.with_repository(repository_id, |repo| {
            repo.object(object_id)?;
            let mut policies = Vec::new();
            if let Some(ids) = repo.policies.get(object_id) {
                for id in ids {
                    policies.push(repo.object(id)?.clone());
                }
            }
            policies.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(policies)
        })
    }
}

impl ProviderSession for InMemoryProvider {
    fn repository(&self) -> Arc<dyn RepositoryCapability> {
        self.state.clone()
    }

    fn navigation(&self) -> Arc<dyn NavigationCapability> {
        self.state.clone()
    }

    fn object(&self) -> Arc<dyn ObjectCapability> {
        self.state.clone()
    }

    fn discovery(&self) -> Arc<dyn DiscoveryCapability> {
        self.state.clone()
    }

    fn relationship(&self) -> Arc<dyn RelationshipCapability> {
        self.state.clone()
    }

    fn versioning(&self) -> Arc<dyn VersioningCapability> {
        self.state.clone()
    }

    fn acl(&self) -> Arc<dyn AclCapability> {
        self.state.clone()
    }

    fn multi_filing(&self) -> Arc<dyn MultiFilingCapability> {
        self.state.clone()
    }

    fn policy(&self) -> Arc<dyn PolicyCapability> {
        self.state.clone()
    }

    fn clear_all_caches(&self) {
        // The in-memory provider keeps no derived caches; record the call so
        // gateway delegation stays observable.
        self.clear_all_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn clear_repository_cache(&self, repository_id: &str) {
        self.cleared_repositories
            .lock()
            .push(repository_id.to_string());
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn provider() -> InMemoryProvider {
        InMemoryProvider::with_sample_content("test")
    }

    #[tokio::test]
    async fn seeded_tree_is_navigable() {
        let provider = provider();
        let navigation = provider.navigation();

        let children = navigation.get_children("test", "root").await.unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["readme.txt", "reports", "secret.txt"]);

        let tree = navigation.get_folder_tree("test", "root", -1).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "folder-reports");

        let parents = navigation.get_object_parents("test", "doc-q3").await.unwrap();
        assert_eq!(parents[0].id, "folder-reports");
    }

    #[tokio::test]
    async fn secured_object_is_permission_denied() {
        let provider = provider();
        let err = provider
            .object()
            .get_object("test", "doc-secret")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn create_document_enforces_name_constraint() {
        let provider = provider();
        let object = provider.object();

        let mut properties = HashMap::new();
        properties.insert("cmis:name".to_string(), serde_json::json!("readme.txt"));
        let err = object
            .create_document("test", properties, Some("root"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConstraint);
    }

    #[tokio::test]
    async fn content_stream_rules() {
        let provider = provider();
        let object = provider.object();

        let stream = object.get_content_stream("test", "doc-readme").await.unwrap();
        assert_eq!(stream.content, b"Hello CMIS");

        let err = object.get_content_stream("test", "root").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamNotSupported);

        let err = object
            .set_content_stream(
                "test",
                "doc-readme",
                ContentStream::new("readme.txt", "text/plain", b"new".to_vec()),
                false,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContentAlreadyExists);

        let updated = object
            .set_content_stream(
                "test",
                "doc-readme",
                ContentStream::new("readme.txt", "text/plain", b"new".to_vec()),
                true,
            )
            .await
            .unwrap();
        assert_ne!(updated.change_token, "seed-doc-readme");
    }

    #[tokio::test]
    async fn delete_rules() {
        let provider = provider();
        let object = provider.object();

        let err = object.delete_object("test", "folder-reports").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);

        let removed = object.delete_tree("test", "folder-reports").await.unwrap();
        assert!(removed.contains(&"doc-q3".to_string()));
        assert!(removed.contains(&"folder-reports".to_string()));

        let err = object.get_object("test", "doc-q3").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ObjectNotFound);
    }

    #[tokio::test]
    async fn multi_filing_round_trip() {
        let provider = provider();
        let multi = provider.multi_filing();

        multi
            .add_object_to_folder("test", "doc-readme", "folder-reports")
            .await
            .unwrap();
        let err = multi
            .add_object_to_folder("test", "doc-readme", "folder-reports")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContentAlreadyExists);

        let parents = provider
            .navigation()
            .get_object_parents("test", "doc-readme")
            .await
            .unwrap();
        assert_eq!(parents.len(), 2);

        multi
            .remove_object_from_folder("test", "doc-readme", "folder-reports")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn lifecycle_hooks_are_recorded() {
        let provider = provider();
        provider.clear_all_caches();
        provider.clear_repository_cache("test");
        provider.close();

        assert_eq!(provider.clear_all_calls(), 1);
        assert_eq!(provider.cleared_repositories(), vec!["test".to_string()]);
        assert!(provider.is_closed());
    }
}
