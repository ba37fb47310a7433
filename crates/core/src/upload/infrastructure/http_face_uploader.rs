use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};

use crate::upload::domain::face_uploader::{FaceUploader, UploadError, UploadPayload};

/// Posts the best face as `multipart/form-data` to a fixed endpoint.
pub struct HttpFaceUploader {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpFaceUploader {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, UploadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn build_form(payload: &UploadPayload) -> Result<Form, UploadError> {
    let image = Part::bytes(payload.png.clone())
        .file_name(payload.file_name())
        .mime_str("image/png")?;

    let mut form = Form::new().part("image", image);
    for (name, value) in payload.fields() {
        form = form.text(name, value);
    }
    Ok(form)
}

impl FaceUploader for HttpFaceUploader {
    fn upload(&self, payload: &UploadPayload) -> Result<String, UploadError> {
        payload.validate()?;

        log::info!(
            "Uploading {} ({} bytes) to {}",
            payload.file_name(),
            payload.png.len(),
            self.url
        );
        let response = self
            .client
            .post(&self.url)
            .multipart(build_form(payload)?)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(response.text()?)
    }
}
