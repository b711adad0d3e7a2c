use thiserror::Error;

/// Main error type for composition and export
#[derive(Error, Debug)]
pub enum MediaError {
    /// An error originating from the underlying FFmpeg library
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] FfmpegError),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The source asset has no usable audio track
    #[error("No audio during video/audio composition")]
    NoAudio,

    /// The source asset has no usable video track
    #[error("No video during video/audio composition")]
    NoVideo,

    /// An export session could not be created for the requested preset
    #[error("Export session could not be created: {0}")]
    ExportConstruction(String),

    /// The export reached a terminal state other than completed
    #[error("Export did not complete: {0}")]
    ExportFailed(String),

    /// A time range was rejected by a composition track
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// The composition handed to the exporter contains no media
    #[error("Composition has no tracks to export")]
    EmptyComposition,

    /// The export was cancelled before it finished
    #[error("Export cancelled")]
    Cancelled,

    /// A requested stream could not be found in the media file
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    /// Subtitle input could not be read or rendered
    #[error("Subtitle error: {0}")]
    Subtitle(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// FFmpeg-specific errors
#[derive(Error, Debug)]
pub enum FfmpegError {
    /// Failure during global FFmpeg initialization
    #[error("FFmpeg initialization failed: {0}")]
    InitFailed(String),

    /// Failure opening an input media file
    #[error("Failed to open input file: {0}")]
    OpenInput(String),

    /// The requested decoder could not be created
    #[error("Failed to find decoder: {0}")]
    DecoderNotFound(String),

    /// The requested encoder was not found
    #[error("Failed to find encoder: {0}")]
    EncoderNotFound(String),

    /// Failure applying configuration parameters to an encoder
    #[error("Failed to configure encoder: {0}")]
    EncoderConfigure(String),

    /// Failure creating an audio resampler
    #[error("Failed to create resampler: {0}")]
    ResamplerCreate(String),

    /// Failure building or running a filter graph
    #[error("Filter graph error: {0}")]
    FilterGraph(String),

    /// Failure creating an output muxer
    #[error("Failed to create muxer: {0}")]
    MuxerCreate(String),

    /// Failure writing the container header
    #[error("Failed to write header: {0}")]
    WriteHeader(String),

    /// Failure writing a media packet to the container
    #[error("Failed to write packet: {0}")]
    WritePacket(String),

    /// Failure writing the container trailer
    #[error("Failed to write trailer: {0}")]
    WriteTrailer(String),

    /// Failure decoding a single packet into a frame
    #[error("Failed to decode packet: {0}")]
    DecodePacket(String),

    /// Failure encoding a single frame into a packet
    #[error("Failed to encode frame: {0}")]
    EncodeFrame(String),

    /// Failure seeking or reading from the input context
    #[error("Failed to read frame: {0}")]
    ReadFrame(String),

    /// Failure configuring stream contexts or parameters
    #[error("Stream configuration failed: {0}")]
    StreamConfig(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, MediaError>;
