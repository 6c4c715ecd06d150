//! Per-channel payload models.
//!
//! Each channel has a native model (what the SDK binding hands the callback,
//! parsed with serde) and a host event (what crosses the boundary, encoded to
//! a plain [`serde_json::Value`]). A [`Signal`] ties the two together.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::Channel;
use crate::error::ConversionError;
use crate::native::RawPayload;

/// Codec for one channel: native model in, host event out.
pub trait Signal: 'static {
    /// Channel this codec serves.
    const CHANNEL: Channel;
    /// Native model parsed from the raw callback payload.
    type Native: DeserializeOwned;
    /// Host event shape.
    type Event: Serialize + From<Self::Native>;
}

/// Convert a raw native payload into the host encoding for signal `S`.
///
/// # Errors
///
/// Returns [`ConversionError::Malformed`] when the payload does not match
/// `S::Native`.
pub fn decode<S: Signal>(raw: RawPayload) -> Result<Value, ConversionError> {
    let native: S::Native = serde_json::from_value(raw).map_err(|source| {
        ConversionError::Malformed {
            channel: S::CHANNEL,
            source,
        }
    })?;
    serde_json::to_value(S::Event::from(native)).map_err(|source| ConversionError::Encode {
        channel: S::CHANNEL,
        source,
    })
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Native connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// Connection is being established.
    Connecting,
    /// Connected to the chat service.
    Connected,
    /// Not connected.
    Disconnected,
    /// Connection dropped, retrying.
    Reconnecting,
    /// Connection attempt failed.
    Failed,
    /// The service cannot be reached.
    Unreachable,
}

/// Connection channel codec. Events encode as the bare status name.
#[derive(Debug)]
pub struct ConnectionSignal;

impl Signal for ConnectionSignal {
    const CHANNEL: Channel = Channel::Connection;
    type Native = ConnectionStatus;
    type Event = ConnectionStatus;
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Availability of the account or a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    /// Agents are available.
    Online,
    /// No agent is available.
    Offline,
}

/// Native department entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NativeDepartment {
    /// Department identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Department availability.
    pub status: Availability,
}

/// Native account configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NativeAccount {
    /// Overall account availability.
    pub status: Availability,
    /// Departments configured for the account.
    #[serde(default)]
    pub departments: Vec<NativeDepartment>,
}

/// Host encoding of a department.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentEvent {
    /// Department identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Department availability.
    pub status: Availability,
}

/// Host encoding of an account update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountEvent {
    /// Overall account availability.
    pub status: Availability,
    /// Departments configured for the account.
    pub departments: Vec<DepartmentEvent>,
}

impl From<NativeAccount> for AccountEvent {
    fn from(account: NativeAccount) -> Self {
        Self {
            status: account.status,
            departments: account
                .departments
                .into_iter()
                .map(|d| DepartmentEvent {
                    id: d.id,
                    name: d.name,
                    status: d.status,
                })
                .collect(),
        }
    }
}

/// Account channel codec.
#[derive(Debug)]
pub struct AccountSignal;

impl Signal for AccountSignal {
    const CHANNEL: Channel = Channel::Account;
    type Native = NativeAccount;
    type Event = AccountEvent;
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Native agent entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NativeAgent {
    /// Agent identifier, when the SDK exposes one.
    #[serde(default)]
    pub id: Option<String>,
    /// Agent nickname.
    pub nick: String,
    /// Name shown to the visitor.
    pub display_name: String,
    /// Local path or URL of the avatar image.
    #[serde(default)]
    pub avatar_path: Option<String>,
    /// Whether the agent is currently typing.
    #[serde(default)]
    pub is_typing: bool,
}

/// Host encoding of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentEvent {
    /// Agent identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Agent nickname.
    pub nick: String,
    /// Name shown to the visitor.
    pub display_name: String,
    /// Avatar location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,
    /// Whether the agent is currently typing.
    pub is_typing: bool,
}

impl From<NativeAgent> for AgentEvent {
    fn from(agent: NativeAgent) -> Self {
        Self {
            id: agent.id,
            nick: agent.nick,
            display_name: agent.display_name,
            avatar_path: agent.avatar_path,
            is_typing: agent.is_typing,
        }
    }
}

/// Full agent roster as delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AgentRoster(pub Vec<AgentEvent>);

impl From<Vec<NativeAgent>> for AgentRoster {
    fn from(agents: Vec<NativeAgent>) -> Self {
        Self(agents.into_iter().map(AgentEvent::from).collect())
    }
}

/// Agents channel codec.
#[derive(Debug)]
pub struct AgentsSignal;

impl Signal for AgentsSignal {
    const CHANNEL: Channel = Channel::Agents;
    type Native = Vec<NativeAgent>;
    type Event = AgentRoster;
}

// ---------------------------------------------------------------------------
// Chat items
// ---------------------------------------------------------------------------

/// Transcript item identifier; the SDK uses numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Numeric identifier.
    Number(u64),
    /// String identifier.
    Text(String),
}

/// Kind of transcript item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatItemKind {
    /// Text message.
    Message,
    /// File attachment.
    AttachmentMessage,
    /// A participant joined.
    MemberJoin,
    /// A participant left.
    MemberLeave,
    /// Visitor rated the chat.
    ChatRating,
    /// Visitor commented on the chat.
    ChatComment,
    /// Agent offered quick-reply options.
    OptionsMessage,
    /// Any kind this bridge does not model.
    #[serde(other)]
    Unknown,
}

/// Delivery state of a visitor-sent item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// Still being sent.
    Pending,
    /// Accepted by the service.
    Delivered,
    /// Sending failed.
    Failed,
}

/// Visitor rating of the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatRating {
    /// Positive rating.
    Good,
    /// Negative rating.
    Bad,
}

/// Image dimensions of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    /// Height in pixels.
    pub height: u32,
    /// Width in pixels.
    pub width: u32,
}

/// Attachment carried by a transcript item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name.
    pub name: String,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Image metadata, for images only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AttachmentMetadata>,
}

/// Native transcript item.
#[derive(Debug, Clone, Deserialize)]
pub struct NativeChatItem {
    /// Item identifier.
    pub id: ItemId,
    /// Sender nickname.
    #[serde(default)]
    pub nick: Option<String>,
    /// Sender display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub create_timestamp: Option<u64>,
    /// Item kind.
    #[serde(default, rename = "type")]
    pub kind: Option<ChatItemKind>,
    /// Message text.
    #[serde(default, alias = "message")]
    pub text: Option<String>,
    /// Delivery state.
    #[serde(default)]
    pub delivery_status: Option<DeliveryStatus>,
    /// Attachment, for attachment messages.
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// Quick-reply options.
    #[serde(default)]
    pub options: Vec<String>,
    /// Rating, for rating items.
    #[serde(default)]
    pub rating: Option<ChatRating>,
    /// Comment, for comment items.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Host encoding of one transcript item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatItemEvent {
    /// Item identifier.
    pub id: ItemId,
    /// Sender nickname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Sender display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_timestamp: Option<u64>,
    /// Item kind.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChatItemKind>,
    /// Message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Delivery state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_status: Option<DeliveryStatus>,
    /// Attachment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    /// Quick-reply options.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Rating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<ChatRating>,
    /// Comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<NativeChatItem> for ChatItemEvent {
    fn from(item: NativeChatItem) -> Self {
        Self {
            id: item.id,
            nick: item.nick,
            display_name: item.display_name,
            create_timestamp: item.create_timestamp,
            kind: item.kind,
            text: item.text,
            delivery_status: item.delivery_status,
            attachment: item.attachment,
            options: item.options,
            rating: item.rating,
            comment: item.comment,
        }
    }
}

/// Chat items channel codec.
#[derive(Debug)]
pub struct ChatItemsSignal;

impl Signal for ChatItemsSignal {
    const CHANNEL: Channel = Channel::ChatItems;
    type Native = NativeChatItem;
    type Event = ChatItemEvent;
}

/// Decoder for `channel`, as a plain function pointer.
pub fn decoder_for(channel: Channel) -> fn(RawPayload) -> Result<Value, ConversionError> {
    match channel {
        Channel::Connection => decode::<ConnectionSignal>,
        Channel::Account => decode::<AccountSignal>,
        Channel::Agents => decode::<AgentsSignal>,
        Channel::ChatItems => decode::<ChatItemsSignal>,
    }
}
