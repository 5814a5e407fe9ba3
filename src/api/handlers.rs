use axum::http::Method;
use serde_json::json;

use crate::api::dispatch::{
    action, param, selector, Dispatcher, HandlerFuture, ListResponse, Operation, ServiceResponse,
};
use crate::error::{last_result_key, CmisError};

/// Routes served on the repository resource (`/{repositoryId}`).
pub fn repository_dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_resource(selector::REPOSITORY_INFO, Method::GET, get_repository_info);
    dispatcher.add_resource(selector::LAST_RESULT, Method::GET, get_last_result);
    dispatcher.add_resource(selector::TYPE_CHILDREN, Method::GET, get_type_children);
    dispatcher.add_resource(selector::TYPE_DESCENDANTS, Method::GET, get_type_descendants);
    dispatcher.add_resource(selector::TYPE_DEFINITION, Method::GET, get_type_definition);
    dispatcher.add_resource(selector::QUERY, Method::GET, query);
    dispatcher.add_resource(action::QUERY, Method::POST, query);
    dispatcher.add_resource(action::CREATE_DOCUMENT, Method::POST, create_document);
    dispatcher
}

/// Routes served on the root resource (`/{repositoryId}/root`).
pub fn root_dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_resource(selector::OBJECT, Method::GET, get_object);
    dispatcher.add_resource(selector::CONTENT, Method::GET, get_content);
    dispatcher.add_resource(selector::CHILDREN, Method::GET, get_children);
    dispatcher.add_resource(selector::DESCENDANTS, Method::GET, get_descendants);
    dispatcher.add_resource(selector::FOLDER_TREE, Method::GET, get_folder_tree);
    dispatcher.add_resource(selector::PARENTS, Method::GET, get_parents);
    dispatcher.add_resource(selector::VERSIONS, Method::GET, get_versions);
    dispatcher.add_resource(action::CREATE_DOCUMENT, Method::POST, create_document);
    dispatcher.add_resource(action::CREATE_FOLDER, Method::POST, create_folder);
    dispatcher.add_resource(action::SET_CONTENT, Method::POST, set_content);
    dispatcher.add_resource(action::DELETE, Method::POST, delete_object);
    dispatcher.add_resource(action::DELETE_TREE, Method::POST, delete_tree);
    dispatcher
}

/// The object the request addresses, falling back to the repository's root
/// folder when no objectId is given.
async fn effective_object_id(op: &Operation<'_>) -> Result<String, CmisError> {
    if let Some(object_id) = op.request.param(param::OBJECT_ID) {
        return Ok(object_id.to_string());
    }
    let info = op
        .binding
        .repository_service()?
        .get_repository_info(op.repository_id)
        .await?;
    Ok(info.root_folder_id.clone())
}

fn get_repository_info<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let info = op
            .binding
            .repository_service()?
            .get_repository_info(op.repository_id)
            .await?;
        Ok(ServiceResponse::ok(serde_json::to_value(&*info)?))
    })
}

fn get_last_result<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let key = last_result_key(op.repository_id, op.context.transaction_key());
        let session = op.binding.session()?;
        let record = session
            .get(&key)
            .and_then(|value| value.to_json())
            .unwrap_or_else(|| json!({ "code": 0 }));
        Ok(ServiceResponse::ok(record))
    })
}

fn get_type_children<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let types = op
            .binding
            .repository_service()?
            .get_type_children(op.repository_id, op.request.param(param::TYPE_ID))
            .await?;
        let items: Vec<_> = types.iter().map(|t| t.as_ref().clone()).collect();
        Ok(ServiceResponse::ok(ListResponse::new(items).to_value()?))
    })
}

fn get_type_descendants<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let types = op
            .binding
            .repository_service()?
            .get_type_descendants(
                op.repository_id,
                op.request.param(param::TYPE_ID),
                op.request.int_param(param::DEPTH, -1),
            )
            .await?;
        let items: Vec<_> = types.iter().map(|t| t.as_ref().clone()).collect();
        Ok(ServiceResponse::ok(ListResponse::new(items).to_value()?))
    })
}

fn get_type_definition<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let type_id = op.request.require(param::TYPE_ID)?;
        let type_def = op
            .binding
            .repository_service()?
            .get_type_definition(op.repository_id, type_id)
            .await?;
        Ok(ServiceResponse::ok(serde_json::to_value(&*type_def)?))
    })
}

fn query<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let statement = op.request.require(param::STATEMENT)?;
        let results = op
            .binding
            .discovery_service()?
            .query(op.repository_id, statement)
            .await?;
        Ok(ServiceResponse::ok(ListResponse::new(results).to_value()?))
    })
}

fn get_object<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let object_id = effective_object_id(op).await?;
        let object = op
            .binding
            .object_service()?
            .get_object(op.repository_id, &object_id)
            .await?;
        Ok(ServiceResponse::ok(serde_json::to_value(object)?))
    })
}

fn get_content<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let object_id = op.request.require(param::OBJECT_ID)?;
        let stream = op
            .binding
            .object_service()?
            .get_content_stream(op.repository_id, object_id)
            .await?;
        Ok(ServiceResponse::content(stream))
    })
}

fn get_children<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let folder_id = effective_object_id(op).await?;
        let children = op
            .binding
            .navigation_service()?
            .get_children(op.repository_id, &folder_id)
            .await?;
        Ok(ServiceResponse::ok(ListResponse::new(children).to_value()?))
    })
}

fn get_descendants<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let folder_id = effective_object_id(op).await?;
        let descendants = op
            .binding
            .navigation_service()?
            .get_descendants(
                op.repository_id,
                &folder_id,
                op.request.int_param(param::DEPTH, -1),
            )
            .await?;
        Ok(ServiceResponse::ok(ListResponse::new(descendants).to_value()?))
    })
}

fn get_folder_tree<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let folder_id = effective_object_id(op).await?;
        let tree = op
            .binding
            .navigation_service()?
            .get_folder_tree(
                op.repository_id,
                &folder_id,
                op.request.int_param(param::DEPTH, -1),
            )
            .await?;
        Ok(ServiceResponse::ok(ListResponse::new(tree).to_value()?))
    })
}

fn get_parents<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let object_id = op.request.require(param::OBJECT_ID)?;
        let parents = op
            .binding
            .navigation_service()?
            .get_object_parents(op.repository_id, object_id)
            .await?;
        Ok(ServiceResponse::ok(ListResponse::new(parents).to_value()?))
    })
}

fn get_versions<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let object_id = op.request.require(param::OBJECT_ID)?;
        let versions = op
            .binding
            .versioning_service()?
            .get_all_versions(op.repository_id, object_id)
            .await?;
        Ok(ServiceResponse::ok(ListResponse::new(versions).to_value()?))
    })
}

fn create_document<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let folder_id = op.request.param(param::OBJECT_ID).map(str::to_string);
        let document = op
            .binding
            .object_service()?
            .create_document(
                op.repository_id,
                op.request.properties(),
                folder_id.as_deref(),
                op.request.content_stream()?,
            )
            .await?;
        Ok(ServiceResponse::created(serde_json::to_value(document)?))
    })
}

fn create_folder<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let folder_id = effective_object_id(op).await?;
        let folder = op
            .binding
            .object_service()?
            .create_folder(op.repository_id, op.request.properties(), &folder_id)
            .await?;
        Ok(ServiceResponse::created(serde_json::to_value(folder)?))
    })
}

fn set_content<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let object_id = op.request.require(param::OBJECT_ID)?;
        let stream = op
            .request
            .content_stream()?
            .ok_or_else(|| CmisError::invalid_argument("Content must be set"))?;
        let object = op
            .binding
            .object_service()?
            .set_content_stream(
                op.repository_id,
                object_id,
                stream,
                op.request.bool_param(param::OVERWRITE, true),
            )
            .await?;
        Ok(ServiceResponse::ok(serde_json::to_value(object)?))
    })
}

fn delete_object<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let object_id = op.request.require(param::OBJECT_ID)?;
        op.binding
            .object_service()?
            .delete_object(op.repository_id, object_id)
            .await?;
        Ok(ServiceResponse::no_content())
    })
}

fn delete_tree<'a>(op: &'a Operation<'a>) -> HandlerFuture<'a> {
    Box::pin(async move {
        let folder_id = op.request.require(param::OBJECT_ID)?;
        let removed = op
            .binding
            .object_service()?
            .delete_tree(op.repository_id, folder_id)
            .await?;
        Ok(ServiceResponse::ok(ListResponse::new(removed).to_value()?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::context::CallContext;
    use crate::api::dispatch::OperationRequest;
    use crate::binding::{default_registry, params, Binding};
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn binding() -> Binding {
        let mut parameters = HashMap::new();
        parameters.insert(params::PROVIDER.to_string(), "memory".to_string());
        parameters.insert(params::REPOSITORY_ID.to_string(), "test".to_string());
        Binding::new(parameters, &default_registry()).unwrap()
    }

    fn get_request(params: &[(&str, &str)]) -> OperationRequest {
        OperationRequest {
            method: Method::GET,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            payload: None,
        }
    }

    #[tokio::test]
    async fn children_default_to_root_folder() {
        let binding = binding();
        let context = CallContext::new("test");
        let request = get_request(&[]);
        let op = Operation {
            context: &context,
            binding: &binding,
            repository_id: "test",
            request: &request,
        };

        let response = root_dispatcher()
            .dispatch(selector::CHILDREN, &op)
            .await
            .unwrap()
            .unwrap();
        match response.body {
            crate::api::dispatch::ResponseBody::Json(value) => {
                assert_eq!(value["total"], 3);
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_route_is_none() {
        let binding = binding();
        let context = CallContext::new("test");
        let request = get_request(&[]);
        let op = Operation {
            context: &context,
            binding: &binding,
            repository_id: "test",
            request: &request,
        };
        assert!(root_dispatcher().dispatch("nope", &op).await.is_none());
    }

    #[tokio::test]
    async fn missing_type_id_is_invalid_argument() {
        let binding = binding();
        let context = CallContext::new("test");
        let request = get_request(&[]);
        let op = Operation {
            context: &context,
            binding: &binding,
            repository_id: "test",
            request: &request,
        };
        let err = repository_dispatcher()
            .dispatch(selector::TYPE_DEFINITION, &op)
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
