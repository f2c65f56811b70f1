use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::turn::{
    chat_title, PendingReply, TurnCallbacks, TurnLog, TurnOutcome, TurnPhase, TurnStep,
};
use crate::auth::AuthContext;
use crate::config::ChatSettings;
use crate::conversation::{Conversation, Message, Role};
use crate::error::{ChatError, ChatResult};
use crate::providers::CompletionProvider;
use crate::store::{ChatRecord, ChatStore};

/// A message shown in a signed-in chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMessage {
    /// Store record, once persisted
    pub record_id: Option<String>,
    pub message: Message,
}

/// Drives chat turns and keeps local state in step with the store
///
/// Signed-in users get persisted chats. Without a user, messages live only in
/// an in-memory guest history.
pub struct ChatController {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<dyn ChatStore>,
    auth: AuthContext,
    settings: ChatSettings,
    callbacks: TurnCallbacks,
    chats: Vec<ChatRecord>,
    current_chat_id: Option<String>,
    messages: Vec<LocalMessage>,
    guest_messages: Conversation,
    pending: PendingReply,
    phase: TurnPhase,
}

impl ChatController {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Arc<dyn ChatStore>,
        auth: AuthContext,
        settings: ChatSettings,
    ) -> Self {
        Self {
            provider,
            store,
            auth,
            settings,
            callbacks: TurnCallbacks::default(),
            chats: Vec::new(),
            current_chat_id: None,
            messages: Vec::new(),
            guest_messages: Conversation::new(),
            pending: PendingReply::new(),
            phase: TurnPhase::Idle,
        }
    }

    pub fn with_callbacks(mut self, callbacks: TurnCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn chats(&self) -> &[ChatRecord] {
        &self.chats
    }

    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat_id.as_deref()
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// A turn is in flight
    pub fn is_loading(&self) -> bool {
        self.phase.is_in_flight()
    }

    /// Reply assembled so far for the in-flight turn
    pub fn streaming_buffer(&self) -> &str {
        self.pending.content()
    }

    /// Signed-in chat messages, with their store records
    pub fn local_messages(&self) -> &[LocalMessage] {
        &self.messages
    }

    pub fn guest_messages(&self) -> &Conversation {
        &self.guest_messages
    }

    /// Messages to render for the current mode
    pub fn display_messages(&self) -> Vec<Message> {
        if self.auth.is_authenticated() {
            self.messages.iter().map(|m| m.message.clone()).collect()
        } else {
            self.guest_messages.messages().to_vec()
        }
    }

    fn set_phase(&mut self, phase: TurnPhase) {
        debug!("turn phase: {} -> {}", self.phase, phase);
        self.phase = phase;
        self.callbacks.phase(phase);
    }

    /// Send one user message and stream the reply
    ///
    /// Fails without touching state for blank input or while another turn is
    /// in flight. Any failure before the reply completes undoes the turn's
    /// side effects. A reply that streamed fully but could not be saved stays
    /// visible and resolves as [`TurnOutcome::CommittedUnsaved`].
    pub async fn send_message(&mut self, input: &str) -> ChatResult<TurnOutcome> {
        if self.phase.is_in_flight() {
            return Err(ChatError::TurnInFlight);
        }
        let text = input.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let owner = self.auth.user().map(|user| user.id);
        let guest = owner.is_none();
        let mut log = TurnLog::new();
        self.pending.clear();

        self.append_local(Message::user(text), guest);
        log.record(TurnStep::LocalAppend { guest });
        self.set_phase(TurnPhase::UserMessageAppended);

        let chat_id = match owner {
            Some(ref owner) => match self.persist_user_message(owner, text, &mut log).await {
                Ok(chat_id) => Some(chat_id),
                Err(e) => return Err(self.roll_back(log, e).await),
            },
            None => None,
        };

        let history = self.history(guest);
        let reply = match self.stream_reply(&history).await {
            Ok(reply) => reply,
            Err(e) => return Err(self.roll_back(log, e).await),
        };

        Ok(self.commit(reply, chat_id, log).await)
    }

    fn append_local(&mut self, message: Message, guest: bool) {
        if guest {
            self.guest_messages.push(message);
        } else {
            self.messages.push(LocalMessage {
                record_id: None,
                message,
            });
        }
    }

    fn history(&self, guest: bool) -> Vec<Message> {
        if guest {
            self.guest_messages.messages().to_vec()
        } else {
            self.messages.iter().map(|m| m.message.clone()).collect()
        }
    }

    /// Create the chat if needed, then store the user message
    async fn persist_user_message(
        &mut self,
        owner: &str,
        text: &str,
        log: &mut TurnLog,
    ) -> ChatResult<String> {
        let chat_id = match self.current_chat_id.clone() {
            Some(id) => id,
            None => {
                let title = chat_title(text, self.settings.title_max_chars);
                let chat = self.store.create_chat(owner, &title).await?;
                info!("created chat {} ({})", chat.id, chat.title);
                log.record(TurnStep::ChatCreated {
                    id: chat.id.clone(),
                });
                let id = chat.id.clone();
                self.chats.insert(0, chat);
                self.current_chat_id = Some(id.clone());
                id
            }
        };

        let record = self.store.create_message(&chat_id, Role::User, text).await?;
        log.record(TurnStep::RemoteMessage {
            id: record.id.clone(),
        });
        if let Some(last) = self.messages.last_mut() {
            last.record_id = Some(record.id);
        }
        Ok(chat_id)
    }

    async fn stream_reply(&mut self, history: &[Message]) -> ChatResult<String> {
        self.set_phase(TurnPhase::Streaming);
        let mut stream = self.provider.stream_completion(history).await?;

        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            self.pending.push(&fragment);
            self.callbacks.fragment(&fragment, self.pending.content());
        }

        Ok(self.pending.take())
    }

    async fn commit(&mut self, reply: String, chat_id: Option<String>, log: TurnLog) -> TurnOutcome {
        let guest = chat_id.is_none();
        self.append_local(Message::assistant(reply.clone()), guest);

        let outcome = match chat_id {
            None => TurnOutcome::Committed { reply },
            Some(chat_id) => {
                match self
                    .store
                    .create_message(&chat_id, Role::Assistant, &reply)
                    .await
                {
                    Ok(record) => {
                        if let Some(last) = self.messages.last_mut() {
                            last.record_id = Some(record.id);
                        }
                        TurnOutcome::Committed { reply }
                    }
                    Err(e) => {
                        error!("failed to save reply: {}", e);
                        self.discard_unanswered(&log).await;
                        self.callbacks.error(&e);
                        TurnOutcome::CommittedUnsaved { reply, error: e }
                    }
                }
            }
        };

        info!(
            "turn committed ({} chars, saved={})",
            outcome.reply().len(),
            outcome.is_saved()
        );
        self.set_phase(TurnPhase::Committed);
        outcome
    }

    /// Remove stored user messages whose reply could not be saved
    ///
    /// A record that could not be deleted keeps its id locally.
    async fn discard_unanswered(&mut self, log: &TurnLog) {
        for id in log.remote_message_ids() {
            if let Err(e) = self.store.delete_message(id).await {
                warn!("failed to delete unanswered message {}: {}", id, e);
                continue;
            }
            for local in self.messages.iter_mut() {
                if local.record_id.as_deref() == Some(id) {
                    local.record_id = None;
                }
            }
        }
    }

    /// Undo the turn's side effects in reverse and hand back the error
    ///
    /// The local user message is only dropped once its stored record is gone,
    /// so local state never hides a message the store still holds.
    async fn roll_back(&mut self, log: TurnLog, err: ChatError) -> ChatError {
        error!("turn failed: {}", err);
        let mut remote_kept = false;
        for step in log.into_undo() {
            match step {
                TurnStep::RemoteMessage { id } => {
                    if let Err(e) = self.store.delete_message(&id).await {
                        warn!("failed to delete message {} during rollback: {}", id, e);
                        remote_kept = true;
                    }
                }
                TurnStep::LocalAppend { guest: true } => {
                    self.guest_messages.pop();
                }
                TurnStep::LocalAppend { guest: false } => {
                    if !remote_kept {
                        self.messages.pop();
                    }
                }
                TurnStep::ChatCreated { .. } => {}
            }
        }

        self.pending.clear();
        self.set_phase(TurnPhase::RolledBack);
        self.callbacks.error(&err);
        err
    }

    /// Fetch the signed-in user's chats, newest first
    ///
    /// Opens the most recent chat when none is current.
    pub async fn load_chats(&mut self) -> ChatResult<&[ChatRecord]> {
        let owner = self.auth.require_user_id()?;
        self.chats = self
            .store
            .list_chats(&owner, self.settings.chat_list_limit)
            .await?;
        debug!("loaded {} chats", self.chats.len());

        if self.current_chat_id.is_none() {
            if let Some(first) = self.chats.first().map(|chat| chat.id.clone()) {
                self.select_chat(&first).await?;
            }
        }
        Ok(&self.chats)
    }

    /// Replace local messages with the stored messages of `chat_id`
    pub async fn load_messages(&mut self, chat_id: &str) -> ChatResult<()> {
        self.auth.require_user_id()?;
        let records = self
            .store
            .list_messages(chat_id, self.settings.message_list_limit)
            .await?;
        self.messages = records
            .into_iter()
            .map(|record| LocalMessage {
                message: record.to_message(),
                record_id: Some(record.id),
            })
            .collect();
        Ok(())
    }

    pub async fn select_chat(&mut self, chat_id: &str) -> ChatResult<()> {
        if self.phase.is_in_flight() {
            return Err(ChatError::TurnInFlight);
        }
        self.load_messages(chat_id).await?;
        self.current_chat_id = Some(chat_id.to_string());
        Ok(())
    }

    /// Start over with no current chat
    pub fn new_chat(&mut self) {
        self.current_chat_id = None;
        self.messages.clear();
        self.guest_messages.clear();
        self.pending.clear();
        self.phase = TurnPhase::Idle;
    }

    /// Forget everything tied to the previous identity
    pub fn reset(&mut self) {
        self.chats.clear();
        self.new_chat();
    }

    pub async fn delete_chat(&mut self, chat_id: &str) -> ChatResult<()> {
        self.auth.require_user_id()?;
        self.store.delete_chat(chat_id).await?;
        self.chats.retain(|chat| chat.id != chat_id);
        if self.current_chat_id.as_deref() == Some(chat_id) {
            self.new_chat();
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("model", &self.provider.model())
            .field("current_chat_id", &self.current_chat_id)
            .field("messages", &self.messages.len())
            .field("guest_messages", &self.guest_messages.len())
            .field("phase", &self.phase)
            .finish()
    }
}
