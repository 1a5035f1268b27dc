//! Request translator - OpenAI request in, backend request out.
//!
//! Validation runs before model resolution so malformed input never causes
//! backend work. Translation itself is infallible once a request is valid.

use crate::domain::{CompletionPayload, CompletionRequest, FinishReason, ModelDescriptor, StopSequences};
use crate::error::GatewayError;
use crate::ports::{BackendMessage, BackendRequest, BackendResponse};
use crate::settings::GatewaySettings;

/// A request that passed validation, with content flattened to text.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    /// Client-requested model; `None` when omitted or blank.
    pub requested_model: Option<String>,
    pub messages: Vec<BackendMessage>,
    pub temperature: Option<f64>,
    /// Positive; not yet clamped.
    pub max_tokens: Option<u32>,
    pub stream: bool,
    pub top_p: Option<f64>,
    pub stop: Option<StopSequences>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub user: Option<String>,
}

/// Converts between the client dialect and the backend dialect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestTranslator {
    max_tokens_ceiling: u32,
    default_temperature: f64,
}

impl RequestTranslator {
    pub const fn new(max_tokens_ceiling: u32, default_temperature: f64) -> Self {
        Self {
            max_tokens_ceiling,
            default_temperature,
        }
    }

    /// Translator configured from a settings snapshot.
    pub const fn from_settings(settings: &GatewaySettings) -> Self {
        Self::new(settings.max_tokens_ceiling, settings.default_temperature)
    }

    /// Validate an inbound request.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for an empty message list, a conversation with no
    /// user or system message, non-text content, a negative or non-finite
    /// temperature, a non-positive `max_tokens`, or out-of-range sampling
    /// parameters.
    pub fn validate(request: CompletionRequest) -> Result<ValidatedRequest, GatewayError> {
        if request.messages.is_empty() {
            return Err(GatewayError::invalid("'messages' must contain at least one message"));
        }
        if !request.messages.iter().any(|m| m.role.is_prompting()) {
            return Err(GatewayError::invalid(
                "'messages' must contain at least one user or system message",
            ));
        }

        let messages = request
            .messages
            .iter()
            .enumerate()
            .map(|(i, message)| {
                message
                    .content
                    .to_text()
                    .map(|content| BackendMessage {
                        role: message.role,
                        content,
                    })
                    .ok_or_else(|| {
                        GatewayError::invalid(format!(
                            "messages[{i}].content: only text content is supported"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(temperature) = request.temperature {
            if !temperature.is_finite() || temperature < 0.0 {
                return Err(GatewayError::invalid(format!(
                    "'temperature' must be a non-negative number, got {temperature}"
                )));
            }
        }

        let max_tokens = match request.max_tokens {
            None => None,
            Some(n) if n <= 0 => {
                return Err(GatewayError::invalid(format!(
                    "'max_tokens' must be a positive integer, got {n}"
                )));
            }
            Some(n) => Some(u32::try_from(n).unwrap_or(u32::MAX)),
        };

        if let Some(top_p) = request.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(GatewayError::invalid(format!(
                    "'top_p' must be between 0 and 1, got {top_p}"
                )));
            }
        }

        for (name, value) in [
            ("frequency_penalty", request.frequency_penalty),
            ("presence_penalty", request.presence_penalty),
        ] {
            if let Some(v) = value {
                if !(-2.0..=2.0).contains(&v) {
                    return Err(GatewayError::invalid(format!(
                        "'{name}' must be between -2 and 2, got {v}"
                    )));
                }
            }
        }

        let requested_model = request
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(ValidatedRequest {
            requested_model,
            messages,
            temperature: request.temperature,
            max_tokens,
            stream: request.stream,
            top_p: request.top_p,
            stop: request.stop,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            user: request.user,
        })
    }

    /// Build the backend request for a resolved model.
    ///
    /// Roles map 1:1, the resolved id replaces the client's model name,
    /// `max_tokens` is clamped to the ceiling, and `stream` passes through.
    pub fn to_backend_request(
        &self,
        request: &ValidatedRequest,
        model: &ModelDescriptor,
    ) -> BackendRequest {
        BackendRequest {
            model: model.id.clone(),
            messages: request.messages.clone(),
            temperature: request.temperature.unwrap_or(self.default_temperature),
            max_tokens: request.max_tokens.map(|n| n.min(self.max_tokens_ceiling)),
            stream: request.stream,
            // 1.0 is the backend default; omit it
            top_p: request.top_p.filter(|p| (p - 1.0).abs() > f64::EPSILON),
            stop: request.stop.clone(),
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            user: request.user.clone(),
        }
    }

    /// Wrap a non-streamed backend answer into the client payload.
    pub fn from_backend_response(response: BackendResponse) -> CompletionPayload {
        CompletionPayload {
            finish_reason: FinishReason::map_backend(response.finish_reason.as_deref()),
            content: response.content,
            usage: response.usage,
        }
    }
}

impl Default for RequestTranslator {
    fn default() -> Self {
        Self::from_settings(&GatewaySettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatMessage, ContentPart, MessageContent, Role, TokenUsage};

    fn hello() -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user("Hello!")])
    }

    fn model() -> ModelDescriptor {
        ModelDescriptor::new("qwen/qwen2.5-coder-14b")
    }

    #[test]
    fn test_rejects_empty_messages() {
        let err = RequestTranslator::validate(CompletionRequest::default()).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[test]
    fn test_rejects_assistant_only_conversation() {
        let request = CompletionRequest::new(vec![ChatMessage::assistant("I said something")]);
        let err = RequestTranslator::validate(request).unwrap_err();
        assert!(err.to_string().contains("user or system"));
    }

    #[test]
    fn test_rejects_bad_sampling_values() {
        assert!(RequestTranslator::validate(hello().with_temperature(-0.1)).is_err());
        assert!(RequestTranslator::validate(hello().with_temperature(f64::NAN)).is_err());
        assert!(RequestTranslator::validate(hello().with_max_tokens(0)).is_err());
        assert!(RequestTranslator::validate(hello().with_max_tokens(-5)).is_err());

        let mut top_p = hello();
        top_p.top_p = Some(1.5);
        assert!(RequestTranslator::validate(top_p).is_err());

        let mut penalty = hello();
        penalty.presence_penalty = Some(3.0);
        assert!(RequestTranslator::validate(penalty).is_err());
    }

    #[test]
    fn test_rejects_image_parts() {
        let request = CompletionRequest::new(vec![ChatMessage::user(MessageContent::Parts(vec![
            ContentPart {
                kind: "image_url".to_string(),
                text: None,
            },
        ]))]);
        let err = RequestTranslator::validate(request).unwrap_err();
        assert!(err.to_string().contains("messages[0]"));
    }

    #[test]
    fn test_blank_model_name_is_omitted() {
        let validated = RequestTranslator::validate(hello().with_model("  ")).unwrap();
        assert!(validated.requested_model.is_none());
    }

    #[test]
    fn test_clamps_max_tokens_to_ceiling() {
        let translator = RequestTranslator::new(2048, 0.7);
        let validated = RequestTranslator::validate(hello().with_max_tokens(100_000)).unwrap();
        let backend = translator.to_backend_request(&validated, &model());
        assert_eq!(backend.max_tokens, Some(2048));

        let small = RequestTranslator::validate(hello().with_max_tokens(256)).unwrap();
        assert_eq!(
            translator.to_backend_request(&small, &model()).max_tokens,
            Some(256)
        );

        let absent = RequestTranslator::validate(hello()).unwrap();
        assert_eq!(translator.to_backend_request(&absent, &model()).max_tokens, None);
    }

    #[test]
    fn test_substitutes_model_and_keeps_roles() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("Be brief."),
            ChatMessage::user("Hello!"),
            ChatMessage::assistant("Hi."),
        ])
        .with_model("gpt-4")
        .with_stream(true);

        let validated = RequestTranslator::validate(request).unwrap();
        let backend = RequestTranslator::default().to_backend_request(&validated, &model());

        assert_eq!(backend.model, "qwen/qwen2.5-coder-14b");
        assert!(backend.stream);
        let roles: Vec<Role> = backend.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert!((backend.temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_top_p_is_not_forwarded() {
        let mut request = hello();
        request.top_p = Some(1.0);
        let validated = RequestTranslator::validate(request).unwrap();
        let backend = RequestTranslator::default().to_backend_request(&validated, &model());
        assert!(backend.top_p.is_none());

        let json = serde_json::to_value(&backend).unwrap();
        assert!(json.get("top_p").is_none());
        assert!(json.get("stop").is_none());
    }

    #[test]
    fn test_round_trip_response() {
        let payload = RequestTranslator::from_backend_response(BackendResponse {
            model: Some("qwen/qwen2.5-coder-14b".to_string()),
            content: "Hi there".to_string(),
            finish_reason: Some("stop".to_string()),
            usage: Some(TokenUsage {
                prompt_tokens: 9,
                completion_tokens: 3,
                total_tokens: 12,
            }),
        });

        assert_eq!(payload.content, "Hi there");
        assert_eq!(payload.finish_reason, FinishReason::Stop);
        assert_eq!(payload.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn test_length_reason_maps() {
        let payload = RequestTranslator::from_backend_response(BackendResponse {
            model: None,
            content: "truncated".to_string(),
            finish_reason: Some("length".to_string()),
            usage: None,
        });
        assert_eq!(payload.finish_reason, FinishReason::Length);
    }
}
