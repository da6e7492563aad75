use thiserror::Error;

/// Errors produced when parsing or decoding a share link.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Malformed link: not a valid URL")]
    InvalidUrl,

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Malformed link: unrecognized path {0}")]
    UnrecognizedPath(String),

    #[error("Malformed link: missing payload fragment")]
    MissingPayload,

    #[error("Malformed link: payload is not valid base64")]
    Base64Decode,

    #[error("Malformed link: payload does not decode")]
    PayloadDecode,

    #[error("Link carries a different share type")]
    WrongShareType,
}

/// Errors produced when editing a channel set.
#[derive(Error, Debug)]
pub enum ChannelSetError {
    #[error("Channel set is full")]
    Full,
}
