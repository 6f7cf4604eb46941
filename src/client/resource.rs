//! Typed CRUD services over a base path.
//!
//! Each service is a plain value built at startup, e.g.
//! `Resource::<Lead>::new(client.clone(), "/leads")`, held in the
//! application's own struct of services.

use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::resilient::ResilientClient;
use crate::http::request::RequestDescriptor;
use crate::http::response::ResponseEnvelope;

pub struct Resource<T> {
    client: Arc<ResilientClient>,
    base_path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_path: self.base_path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Resource<T> {
    pub fn new(client: Arc<ResilientClient>, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_path,
            _marker: PhantomData,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub async fn list(&self, params: &[(&str, &str)]) -> ResponseEnvelope<Vec<T>> {
        let request = RequestDescriptor::get(self.base_path.as_str())
            .with_params(params.iter().map(|&(k, v)| (k, v)));
        self.client.request(request).await
    }

    pub async fn get(&self, id: impl Display) -> ResponseEnvelope<T> {
        self.client.get(&self.item_path(id)).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> ResponseEnvelope<T> {
        self.client.post(&self.base_path, body).await
    }

    /// Full replacement (PUT).
    pub async fn update<B: Serialize + ?Sized>(&self, id: impl Display, body: &B) -> ResponseEnvelope<T> {
        self.client.put(&self.item_path(id), body).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, id: impl Display, body: &B) -> ResponseEnvelope<T> {
        self.client.patch(&self.item_path(id), body).await
    }

    pub async fn delete(&self, id: impl Display) -> ResponseEnvelope<Value> {
        self.client.delete(&self.item_path(id)).await
    }

    fn item_path(&self, id: impl Display) -> String {
        format!("{}/{}", self.base_path, id)
    }
}
