use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::exchange::{InputFormat, UploadRequest};
use crate::service::{API_KEY_HEADER, ServiceReply, TransformService};
use crate::transform::TransformRequest;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// [`TransformService`] over HTTP. The API key is injected through the
/// configuration at construction.
#[derive(Debug, Clone)]
pub struct HttpTransformService {
    client: Client,
    config: ServiceConfig,
}

impl HttpTransformService {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ServiceError::Transport(err.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn geojson_url(&self) -> String {
        format!("{}/transform/geojson", self.base_url())
    }

    pub fn upload_url(&self, format: InputFormat) -> String {
        format!("{}/transform/{}", self.base_url(), format.as_str())
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    fn send(builder: RequestBuilder) -> Result<ServiceReply, ServiceError> {
        let response = builder
            .send()
            .map_err(|err| ServiceError::Transport(err.to_string()))?;
        read_reply(response)
    }
}

fn read_reply(response: Response) -> Result<ServiceReply, ServiceError> {
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .map_err(|err| ServiceError::Transport(err.to_string()))?;
    log::debug!("Service replied {status} ({} bytes)", body.len());
    Ok(ServiceReply::new(status, body.to_vec()))
}

impl TransformService for HttpTransformService {
    fn post_geojson(&self, request: &TransformRequest) -> Result<ServiceReply, ServiceError> {
        let builder = self.client.post(self.geojson_url()).json(request);
        Self::send(self.authorize(builder))
    }

    fn post_upload(&self, upload: &UploadRequest) -> Result<ServiceReply, ServiceError> {
        let config = serde_json::to_string(upload.config())
            .map_err(|err| ServiceError::Transport(err.to_string()))?;
        let file = Part::bytes(upload.bytes().to_vec()).file_name(upload.file_name().to_owned());
        let form = Form::new().part("file", file).text("config", config);

        let builder = self
            .client
            .post(self.upload_url(upload.format()))
            .multipart(form);
        Self::send(self.authorize(builder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_built_from_the_base_url() {
        let service = HttpTransformService::new(ServiceConfig {
            base_url: "https://example.test/v1/".into(),
            api_key: None,
        })
        .unwrap();
        assert_eq!(service.geojson_url(), "https://example.test/v1/transform/geojson");
        assert_eq!(
            service.upload_url(InputFormat::Dxf),
            "https://example.test/v1/transform/dxf"
        );
    }
}
