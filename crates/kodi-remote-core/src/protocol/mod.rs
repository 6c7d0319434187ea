//! Kodi JSON-RPC protocol: envelopes, frame classification and notifications.

pub mod codec;
pub mod messages;
pub mod notifications;
pub mod results;
pub mod sequence;

pub use codec::{decode_frame, encode_request, CodecError};
pub use messages::{InboundFrame, KodiTime, RawNotification, Request, RequestId, Response};
pub use notifications::Notification;
pub use results::{
    parse_active_players, parse_application_properties, parse_player_properties,
    parse_playlist_items, ApplicationProperties,
};
pub use sequence::RequestIdCounter;
