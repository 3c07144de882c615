//! The reply transport seam.
//!
//! The engine never talks HTTP itself. Everything it sends — handler replies,
//! deferred acknowledgements, denials, janitor edits — funnels through the
//! [`ReplyTransport`] trait, implemented by the embedding application's REST
//! client. Swapping transports (or recording them in tests) only requires
//! implementing this trait.

use async_trait::async_trait;

use crate::types::id::{ApplicationMarker, Id, InteractionMarker};
use crate::types::response::{InteractionResponse, ReplyPayload};
use crate::BoxError;

/// Outbound calls the dispatch engine makes against the platform.
#[async_trait]
pub trait ReplyTransport: Send + Sync {
    /// Send the initial response to an interaction (message, update, or
    /// deferred acknowledgement — distinguished by the response's kind).
    async fn create_response(
        &self,
        interaction_id: Id<InteractionMarker>,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<(), BoxError>;

    /// Edit the original reply message of an interaction, addressed by its
    /// token. Used by reply-context janitors.
    async fn edit_original_response(
        &self,
        application_id: Id<ApplicationMarker>,
        token: &str,
        payload: &ReplyPayload,
    ) -> Result<(), BoxError>;
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::types::response::InteractionCallbackType;

    #[derive(Debug, Clone)]
    pub(crate) struct SentResponse {
        pub interaction_id: Id<InteractionMarker>,
        pub token: String,
        pub kind: InteractionCallbackType,
        pub payload: Option<ReplyPayload>,
    }

    #[derive(Debug, Clone)]
    pub(crate) struct SentEdit {
        pub application_id: Id<ApplicationMarker>,
        pub token: String,
        pub payload: ReplyPayload,
    }

    /// Records every outbound call; optionally fails all sends.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingTransport {
        pub responses: Mutex<Vec<SentResponse>>,
        pub edits: Mutex<Vec<SentEdit>>,
        pub fail_sends: AtomicBool,
    }

    impl RecordingTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn response_kinds(&self) -> Vec<InteractionCallbackType> {
            self.responses.lock().unwrap().iter().map(|r| r.kind).collect()
        }

        pub(crate) fn last_response(&self) -> Option<SentResponse> {
            self.responses.lock().unwrap().last().cloned()
        }

        pub(crate) fn edit_count(&self) -> usize {
            self.edits.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ReplyTransport for RecordingTransport {
        async fn create_response(
            &self,
            interaction_id: Id<InteractionMarker>,
            token: &str,
            response: &InteractionResponse,
        ) -> Result<(), BoxError> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err("transport down".into());
            }
            self.responses.lock().unwrap().push(SentResponse {
                interaction_id,
                token: token.to_string(),
                kind: response.kind,
                payload: response.data.clone(),
            });
            Ok(())
        }

        async fn edit_original_response(
            &self,
            application_id: Id<ApplicationMarker>,
            token: &str,
            payload: &ReplyPayload,
        ) -> Result<(), BoxError> {
            if self.fail_sends.load(Ordering::SeqCst) {
                return Err("transport down".into());
            }
            self.edits.lock().unwrap().push(SentEdit {
                application_id,
                token: token.to_string(),
                payload: payload.clone(),
            });
            Ok(())
        }
    }
}
