//! Polling for management-plane long-running operations
//!
//! The submitting response decides how an operation is tracked:
//!
//! - `Azure-AsyncOperation` header: poll that URL, read `status` from the body
//! - `Location` header on 201/202: poll that URL until it stops answering 202
//! - `properties.provisioningState` on a PUT/PATCH body: re-read the resource
//!
//! Anything else finished synchronously.

use super::lro::{ArmOperation, OperationPoller, OperationStatus, PollResponse};
use super::response::Converter;
use crate::arm::error::{ArmError, ArmResult, ServiceError, TransportError};
use crate::arm::http::{ArmRequest, RawResponse};
use crate::arm::options::ClientConfig;
use crate::arm::pipeline::Pipeline;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use url::Url;

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
const LOCATION_HEADER: &str = "location";

#[derive(Debug, Clone)]
enum PollMode {
    AsyncOperation(Url),
    Location(Url),
    ProvisioningState,
}

pub struct ArmPoller {
    pipeline: Pipeline,
    method: Method,
    resource_url: Url,
    mode: PollMode,
    final_location: Option<Url>,
}

fn header_url(response: &RawResponse, name: &str) -> ArmResult<Option<Url>> {
    match response.header(name) {
        Some(value) => Url::parse(value).map(Some).map_err(|e| {
            ArmError::from(TransportError::InvalidResponse(format!(
                "{} header is not a URL: {}",
                name, e
            )))
        }),
        None => Ok(None),
    }
}

pub(crate) fn provisioning_state(body: &Value) -> Option<&str> {
    body.get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(Value::as_str)
}

fn is_put_or_patch(method: &Method) -> bool {
    *method == Method::PUT || *method == Method::PATCH
}

/// Wrap a submitting response in an operation handle.
pub(crate) fn start_operation<T>(
    config: &ClientConfig,
    method: Method,
    resource_url: Url,
    initial: RawResponse,
    convert: Converter<T>,
) -> ArmResult<ArmOperation<T>> {
    let async_url = header_url(&initial, ASYNC_OPERATION_HEADER)?;
    let location = header_url(&initial, LOCATION_HEADER)?;

    let mode = if let Some(url) = async_url {
        Some(PollMode::AsyncOperation(url))
    } else if let (Some(url), 201 | 202) = (location.clone(), initial.status) {
        Some(PollMode::Location(url))
    } else if is_put_or_patch(&method)
        && provisioning_state(&initial.body)
            .is_some_and(|s| OperationStatus::parse(s) != OperationStatus::Succeeded)
    {
        Some(PollMode::ProvisioningState)
    } else {
        None
    };

    match mode {
        Some(mode) => {
            tracing::debug!("{} {} accepted, tracking via {:?}", method, resource_url, mode);
            let poller = ArmPoller {
                pipeline: config.pipeline().clone(),
                method,
                resource_url,
                mode,
                final_location: location,
            };
            Ok(ArmOperation::pending(
                initial,
                Box::new(poller),
                config.poll_interval(),
                convert,
            ))
        }
        None => Ok(ArmOperation::completed(initial, convert)),
    }
}

impl ArmPoller {
    async fn get(&self, url: &Url) -> ArmResult<RawResponse> {
        self.pipeline
            .send(ArmRequest::new(Method::GET, url.clone()))
            .await
    }
}

#[async_trait]
impl OperationPoller for ArmPoller {
    async fn poll(&mut self) -> ArmResult<PollResponse> {
        match &self.mode {
            PollMode::AsyncOperation(url) => {
                let raw = self.get(url).await?;
                let status = raw
                    .body
                    .get("status")
                    .and_then(Value::as_str)
                    .map(OperationStatus::parse)
                    .unwrap_or(OperationStatus::InProgress);
                let error = ServiceError::from_body(&raw.body);
                Ok(PollResponse::new(status, raw).with_error(error))
            }
            PollMode::Location(url) => match self.get(url).await {
                Ok(raw) if raw.status == 202 => Ok(PollResponse::new(OperationStatus::InProgress, raw)),
                Ok(raw) => Ok(PollResponse::new(OperationStatus::Succeeded, raw)),
                // The monitor URL reports a failed operation with an error status
                Err(ArmError::Transport(TransportError::Status { status, error })) => {
                    let error = error.unwrap_or_else(|| {
                        ServiceError::new(status.to_string(), "operation failed")
                    });
                    Ok(PollResponse::new(OperationStatus::Failed, RawResponse::new(status, Value::Null))
                        .with_error(Some(error)))
                }
                Err(e) => Err(e),
            },
            PollMode::ProvisioningState => {
                let raw = self.get(&self.resource_url).await?;
                let status = provisioning_state(&raw.body)
                    .map(OperationStatus::parse)
                    .unwrap_or(OperationStatus::Succeeded);
                Ok(PollResponse::new(status, raw))
            }
        }
    }

    async fn final_response(&mut self, last: RawResponse) -> ArmResult<RawResponse> {
        if is_put_or_patch(&self.method) {
            return match self.mode {
                PollMode::ProvisioningState => Ok(last),
                _ => self.get(&self.resource_url).await,
            };
        }
        if self.method == Method::POST && matches!(self.mode, PollMode::AsyncOperation(_)) {
            if let Some(location) = &self.final_location {
                return self.get(location).await;
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::lro::OperationState;
    use crate::resource::response::unit_converter;
    use serde_json::json;

    fn config() -> ClientConfig {
        ClientConfig::builder().build().unwrap()
    }

    fn url() -> Url {
        Url::parse("https://management.azure.com/subscriptions/s/resourceGroups/rg").unwrap()
    }

    #[test]
    fn test_synchronous_response_is_completed() {
        let op = start_operation(
            &config(),
            Method::PUT,
            url(),
            RawResponse::new(200, json!({"properties": {"provisioningState": "Succeeded"}})),
            unit_converter(),
        )
        .unwrap();
        assert_eq!(op.state(), &OperationState::Succeeded);
    }

    #[test]
    fn test_async_operation_header_starts_polling() {
        let initial = RawResponse::new(201, json!({}))
            .with_header("Azure-AsyncOperation", "https://management.azure.com/ops/1");
        let op = start_operation(&config(), Method::PUT, url(), initial, unit_converter()).unwrap();
        assert_eq!(op.state(), &OperationState::Submitted);
    }

    #[test]
    fn test_location_only_counts_on_accepted() {
        let accepted = RawResponse::new(202, Value::Null)
            .with_header("Location", "https://management.azure.com/ops/2");
        let op = start_operation(&config(), Method::DELETE, url(), accepted, unit_converter()).unwrap();
        assert!(!op.has_completed());

        let ok = RawResponse::new(200, Value::Null)
            .with_header("Location", "https://management.azure.com/ops/2");
        let op = start_operation(&config(), Method::DELETE, url(), ok, unit_converter()).unwrap();
        assert!(op.has_completed());
    }

    #[test]
    fn test_provisioning_state_only_for_put_and_patch() {
        let creating = json!({"properties": {"provisioningState": "Creating"}});
        let op = start_operation(
            &config(),
            Method::PUT,
            url(),
            RawResponse::new(201, creating.clone()),
            unit_converter(),
        )
        .unwrap();
        assert!(!op.has_completed());

        let op = start_operation(
            &config(),
            Method::POST,
            url(),
            RawResponse::new(200, creating),
            unit_converter(),
        )
        .unwrap();
        assert!(op.has_completed());
    }

    #[test]
    fn test_bad_header_url_is_rejected() {
        let initial = RawResponse::new(201, json!({})).with_header("Azure-AsyncOperation", "not a url");
        let err = start_operation(&config(), Method::PUT, url(), initial, unit_converter()).unwrap_err();
        assert!(matches!(err, ArmError::Transport(TransportError::InvalidResponse(_))));
    }
}
