//! Audio and video decoders for the export pipeline
//!
//! Wrap an FFmpeg `AVCodecContext` to decode compressed packets of a source
//! stream into raw PCM or picture `AVFrame`s.

use crate::error::{FfmpegError, MediaError, Result};
use ffmpeg_next as ffmpeg;

/// Map the "need more input" and "drained" responses of the send/receive API
/// to `Ok(None)`.
fn receive_or_none(
    result: std::result::Result<(), ffmpeg::Error>,
    stream_index: usize,
) -> Result<Option<()>> {
    match result {
        Ok(()) => Ok(Some(())),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(None),
        Err(ffmpeg::Error::Eof) => Ok(None),
        Err(e) => Err(MediaError::Ffmpeg(FfmpegError::DecodePacket(format!(
            "receive_frame error on stream {}: {}",
            stream_index, e
        )))),
    }
}

fn send_eof_result(
    result: std::result::Result<(), ffmpeg::Error>,
    stream_index: usize,
) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        // Decoder is already drained or has no buffered data
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(()),
        Err(ffmpeg::Error::Eof) => Ok(()),
        Err(e) => Err(MediaError::Ffmpeg(FfmpegError::DecodePacket(format!(
            "send_eof error on stream {}: {}",
            stream_index, e
        )))),
    }
}

fn send_packet_result(
    result: std::result::Result<(), ffmpeg::Error>,
    stream_index: usize,
) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        // Corrupt packet or decoder pre-roll: skip it and keep going
        Err(ffmpeg::Error::InvalidData) => {
            tracing::debug!(stream_index, "send_packet: skipping invalid packet");
            Ok(())
        }
        Err(e) => Err(MediaError::Ffmpeg(FfmpegError::DecodePacket(format!(
            "send_packet error on stream {}: {}",
            stream_index, e
        )))),
    }
}

fn open_context(stream: &ffmpeg::format::stream::Stream) -> Result<ffmpeg::codec::Context> {
    ffmpeg::codec::Context::from_parameters(stream.parameters()).map_err(|e| {
        MediaError::Ffmpeg(FfmpegError::DecoderNotFound(format!(
            "Failed to create codec context for stream {}: {}",
            stream.index(),
            e
        )))
    })
}

/// Audio decoder backed by a FFmpeg codec context
pub struct AudioDecoder {
    decoder: ffmpeg::decoder::Audio,
    stream_index: usize,
}

impl AudioDecoder {
    /// Open a decoder for the given stream, using the stream's own codec
    /// parameters.
    pub fn open(stream: &ffmpeg::format::stream::Stream) -> Result<Self> {
        let stream_index = stream.index();
        let decoder = open_context(stream)?.decoder().audio().map_err(|e| {
            MediaError::Ffmpeg(FfmpegError::DecoderNotFound(format!(
                "Failed to open audio decoder for stream {}: {}",
                stream_index, e
            )))
        })?;

        Ok(Self {
            decoder,
            stream_index,
        })
    }

    /// Send a compressed packet to the decoder.
    ///
    /// `AVERROR_INVALIDDATA` is treated as non-fatal.
    pub fn send_packet(&mut self, packet: &ffmpeg::codec::packet::Packet) -> Result<()> {
        send_packet_result(self.decoder.send_packet(packet), self.stream_index)
    }

    /// Send EOF to flush the decoder's internal buffers.
    pub fn send_eof(&mut self) -> Result<()> {
        send_eof_result(self.decoder.send_eof(), self.stream_index)
    }

    /// Receive one decoded PCM frame, or `None` if the decoder needs more
    /// input.
    pub fn receive_frame(&mut self) -> Result<Option<ffmpeg::util::frame::Audio>> {
        let mut frame = ffmpeg::util::frame::Audio::empty();
        let got = receive_or_none(self.decoder.receive_frame(&mut frame), self.stream_index)?;
        Ok(got.map(|_| frame))
    }

    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    pub fn sample_rate(&self) -> u32 {
        self.decoder.rate()
    }
}

/// Video decoder backed by a FFmpeg codec context
pub struct VideoDecoder {
    decoder: ffmpeg::decoder::Video,
    stream_index: usize,
}

impl VideoDecoder {
    /// Open a decoder for the given video stream.
    pub fn open(stream: &ffmpeg::format::stream::Stream) -> Result<Self> {
        let stream_index = stream.index();
        let decoder = open_context(stream)?.decoder().video().map_err(|e| {
            MediaError::Ffmpeg(FfmpegError::DecoderNotFound(format!(
                "Failed to open video decoder for stream {}: {}",
                stream_index, e
            )))
        })?;

        Ok(Self {
            decoder,
            stream_index,
        })
    }

    pub fn send_packet(&mut self, packet: &ffmpeg::codec::packet::Packet) -> Result<()> {
        send_packet_result(self.decoder.send_packet(packet), self.stream_index)
    }

    pub fn send_eof(&mut self) -> Result<()> {
        send_eof_result(self.decoder.send_eof(), self.stream_index)
    }

    /// Receive one decoded picture, or `None` if the decoder needs more input.
    ///
    /// The frame's pts is replaced by its best-effort timestamp so that
    /// B-frame reordering never leaves it unset.
    pub fn receive_frame(&mut self) -> Result<Option<ffmpeg::util::frame::Video>> {
        let mut frame = ffmpeg::util::frame::Video::empty();
        if receive_or_none(self.decoder.receive_frame(&mut frame), self.stream_index)?.is_none() {
            return Ok(None);
        }
        let ts = frame.timestamp().or(frame.pts());
        frame.set_pts(ts);
        Ok(Some(frame))
    }

    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    pub fn format(&self) -> ffmpeg::format::Pixel {
        self.decoder.format()
    }

    pub fn aspect_ratio(&self) -> ffmpeg::Rational {
        self.decoder.aspect_ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_decoders_registered() {
        for id in [
            ffmpeg::codec::Id::AAC,
            ffmpeg::codec::Id::H264,
            ffmpeg::codec::Id::MP3,
        ] {
            let decoder = ffmpeg::codec::decoder::find(id);
            assert!(decoder.is_some(), "missing decoder for {:?}", id);
            assert_eq!(decoder.unwrap().id(), id);
        }
    }

    #[test]
    fn test_receive_or_none_maps_eagain() {
        let eagain = Err(ffmpeg::Error::Other {
            errno: ffmpeg::error::EAGAIN,
        });
        assert!(receive_or_none(eagain, 0).unwrap().is_none());
        assert!(receive_or_none(Err(ffmpeg::Error::Eof), 0).unwrap().is_none());
        assert!(receive_or_none(Ok(()), 0).unwrap().is_some());
        assert!(receive_or_none(Err(ffmpeg::Error::Bug), 0).is_err());
    }

    #[test]
    fn test_send_packet_skips_invalid_data() {
        assert!(send_packet_result(Err(ffmpeg::Error::InvalidData), 1).is_ok());
        assert!(send_packet_result(Err(ffmpeg::Error::Bug), 1).is_err());
    }
}
