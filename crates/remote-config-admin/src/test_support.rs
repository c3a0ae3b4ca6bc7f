//! Scripted transport used by the service tests.

#![cfg(test)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{ListVersionsOptions, PublishOptions, RemoteConfigApi};
use crate::http::HttpError;
use crate::template::Template;

/// One transport call as observed by [`StubApi`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    GetTemplate,
    GetTemplateAtVersion(i64),
    ValidateTemplate { etag: String },
    PublishTemplate { etag: String, force: bool },
    Rollback(i64),
    ListVersions(ListVersionsOptions),
}

#[derive(Default)]
struct StubState {
    responses: VecDeque<Result<Value, HttpError>>,
    calls: Vec<Call>,
}

/// Replays queued responses in order and records every call it receives.
#[derive(Clone, Default)]
pub(crate) struct StubApi {
    state: Arc<Mutex<StubState>>,
}

impl StubApi {
    pub(crate) fn replying<const N: usize>(responses: [Result<Value, HttpError>; N]) -> Self {
        let stub = Self::default();
        stub.state
            .lock()
            .expect("stub state poisoned")
            .responses
            .extend(responses);
        stub
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().expect("stub state poisoned").calls.clone()
    }

    fn answer(&self, call: Call) -> Result<Value, HttpError> {
        let mut state = self.state.lock().expect("stub state poisoned");
        state.calls.push(call.clone());
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response left for {call:?}"))
    }
}

#[async_trait]
impl RemoteConfigApi for StubApi {
    async fn get_template(&self) -> Result<Value, HttpError> {
        self.answer(Call::GetTemplate)
    }

    async fn get_template_at_version(&self, version_number: i64) -> Result<Value, HttpError> {
        self.answer(Call::GetTemplateAtVersion(version_number))
    }

    async fn validate_template(&self, template: &Template) -> Result<Value, HttpError> {
        self.answer(Call::ValidateTemplate {
            etag: template.etag().to_string(),
        })
    }

    async fn publish_template(
        &self,
        template: &Template,
        options: PublishOptions,
    ) -> Result<Value, HttpError> {
        self.answer(Call::PublishTemplate {
            etag: template.etag().to_string(),
            force: options.force,
        })
    }

    async fn rollback(&self, version_number: i64) -> Result<Value, HttpError> {
        self.answer(Call::Rollback(version_number))
    }

    async fn list_versions(&self, options: &ListVersionsOptions) -> Result<Value, HttpError> {
        self.answer(Call::ListVersions(options.clone()))
    }
}
