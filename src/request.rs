use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart;
use serde::Serialize;

use crate::errors::Error;

/// A request that can be dispatched more than once.
///
/// `reqwest::Request` cannot be cloned once it carries a multipart stream, so
/// the body is kept in a replayable form and materialized per dispatch.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Never start a reissue for this request; a 401 is returned as-is.
    pub skip_reissue: bool,
    pub(crate) retried: bool,
}

#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Form(FormPayload),
}

#[derive(Clone, Debug, Default)]
pub struct FormPayload {
    fields: Vec<FormField>,
}

#[derive(Clone, Debug)]
struct FormField {
    name: String,
    value: FormValue,
}

#[derive(Clone, Debug)]
enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            skip_reissue: false,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn form(mut self, form: FormPayload) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn skip_reissue(mut self) -> Self {
        self.skip_reissue = true;
        self
    }

    /// Whether this request has already been replayed after a reissue.
    pub fn retried(&self) -> bool {
        self.retried
    }
}

impl RequestBody {
    pub fn is_form(&self) -> bool {
        matches!(self, RequestBody::Form(_))
    }
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FormValue::Text(value.into()),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                mime: mime.map(str::to_string),
                bytes,
            },
        });
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn to_multipart(&self) -> Result<multipart::Form, Error> {
        let mut form = multipart::Form::new();
        for field in &self.fields {
            form = match &field.value {
                FormValue::Text(text) => form.text(field.name.clone(), text.clone()),
                FormValue::File {
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut part =
                        multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        part = part.mime_str(mime)?;
                    }
                    form.part(field.name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}
