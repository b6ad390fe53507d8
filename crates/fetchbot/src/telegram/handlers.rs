//! Dispatcher schema: /start, URL messages and quality buttons.
//!
//! Downloads run in spawned tasks so a busy chat can still be answered
//! immediately; the per-chat gate lives in [`FetchService`].

use std::sync::Arc;

use fetchcore::delivery::StatusHandle;
use fetchcore::download::quality::CALLBACK_PREFIX;
use fetchcore::jobs::Rejection;
use fetchcore::pipeline::messages;
use fetchcore::{ChoiceOutcome, ChoiceResolution, ConversationId, FetchService, SenderId};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::bot::{Command, START_TEXT};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub service: Arc<FetchService>,
}

impl HandlerDeps {
    pub fn new(service: Arc<FetchService>) -> Self {
        Self { service }
    }
}

pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler())
        .branch(message_handler(deps.clone()))
        .branch(callback_handler(deps))
}

fn command_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| async move {
            log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);
            match cmd {
                Command::Start => {
                    bot.send_message(msg.chat.id, START_TEXT).await?;
                }
            }
            Ok::<(), HandlerError>(())
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(text) = msg.text().map(str::to_string) else {
                    return Ok::<(), HandlerError>(());
                };
                let chat = ConversationId(msg.chat.id.0);
                let user = SenderId(msg.from.as_ref().map(|u| u.id.0).unwrap_or_default());

                tokio::spawn(async move {
                    match deps.service.handle_url(chat, user, &text).await {
                        Ok(outcome) => log::debug!("REQUEST | chat={} outcome={:?}", chat, outcome),
                        Err(e) => log::error!("REQUEST | chat={} | {}", chat, e),
                    }
                });
                Ok::<(), HandlerError>(())
            }
        })
}

/// Text shown on the button press answer, if any.
fn answer_text(outcome: &ChoiceOutcome) -> Option<&'static str> {
    match outcome {
        ChoiceOutcome::Malformed => Some(messages::INVALID_CHOICE),
        ChoiceOutcome::Rejected(Rejection::Foreign) => Some(messages::INVALID_CHOICE),
        ChoiceOutcome::Rejected(Rejection::Unknown | Rejection::Expired) => Some(messages::EXPIRED),
        ChoiceOutcome::Busy => Some(messages::BUSY),
        ChoiceOutcome::Cancelled | ChoiceOutcome::Completed { .. } | ChoiceOutcome::Failed => None,
    }
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let prefix = format!("{}|", CALLBACK_PREFIX);
    Update::filter_callback_query()
        .filter(move |q: CallbackQuery| q.data.as_deref().is_some_and(|d| d.starts_with(&prefix)))
        .endpoint(move |bot: Bot, q: CallbackQuery| {
            let deps = deps.clone();
            async move {
                let data = q.data.clone().unwrap_or_default();
                let user = SenderId(q.from.id.0);
                let menu = q.message.as_ref().map(|m| StatusHandle {
                    chat: ConversationId(m.chat().id.0),
                    message_id: m.id().0,
                });

                match deps.service.accept_choice(user, &data, menu).await {
                    ChoiceResolution::Done(outcome) => {
                        let mut answer = bot.answer_callback_query(q.id.clone());
                        if let Some(text) = answer_text(&outcome) {
                            answer = answer.text(text);
                        }
                        answer.await?;
                    }
                    ChoiceResolution::Accepted(accepted) => {
                        bot.answer_callback_query(q.id.clone()).await?;
                        log::info!("CHOICE | accepted {} for chat {}", accepted.choice(), accepted.chat());
                        let service = deps.service.clone();
                        tokio::spawn(async move {
                            if let Err(e) = service.run_choice(accepted, menu).await {
                                log::error!("CHOICE | {}", e);
                            }
                        });
                    }
                }
                Ok::<(), HandlerError>(())
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_answer_texts() {
        assert_eq!(answer_text(&ChoiceOutcome::Malformed), Some(messages::INVALID_CHOICE));
        assert_eq!(
            answer_text(&ChoiceOutcome::Rejected(Rejection::Expired)),
            Some(messages::EXPIRED)
        );
        assert_eq!(answer_text(&ChoiceOutcome::Busy), Some(messages::BUSY));
        assert_eq!(answer_text(&ChoiceOutcome::Cancelled), None);
    }
}
