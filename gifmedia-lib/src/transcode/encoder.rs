//! AAC and H.264 encoders for the export pipeline

use crate::error::{FfmpegError, MediaError, Result};
use crate::ffmpeg_utils::helpers::encoder_codec_parameters;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec;
use ffmpeg_next::util::format::sample::Sample;

use super::resampler::layout_for_channels;

/// Sample format the AAC encoder expects from the resampler
pub const ENCODER_SAMPLE_FMT: Sample = Sample::F32(ffmpeg::util::format::sample::Type::Planar);
/// AAC encoder frame size (number of samples per channel per frame)
pub const AAC_FRAME_SIZE: usize = 1024;
/// Preferred H.264 encoder
pub const X264_ENCODER: &str = "libx264";

fn encode_err(context: &str, e: ffmpeg::Error) -> MediaError {
    MediaError::Ffmpeg(FfmpegError::EncodeFrame(format!("{}: {}", context, e)))
}

/// Receive one packet from an encoder, mapping EAGAIN/EOF to `None`.
fn receive(
    encoder: &mut ffmpeg::encoder::Encoder,
    context: &str,
) -> Result<Option<ffmpeg::codec::packet::Packet>> {
    let mut packet = ffmpeg::codec::packet::Packet::empty();
    match encoder.receive_packet(&mut packet) {
        Ok(()) => Ok(Some(packet)),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(None),
        Err(ffmpeg::Error::Eof) => Ok(None),
        Err(e) => Err(encode_err(context, e)),
    }
}

/// AAC encoder backed by a real FFmpeg codec context
pub struct AacEncoder {
    encoder: ffmpeg::encoder::Audio,
    frame_size: usize,
    output_timebase: ffmpeg::Rational,
    pts: i64,
}

impl AacEncoder {
    /// Open an AAC-LC encoder.
    ///
    /// `global_header` must be set when the target muxer (MOV, M4A) stores
    /// codec extradata out of band.
    pub fn open(sample_rate: u32, channels: u16, bitrate: u64, global_header: bool) -> Result<Self> {
        let codec = codec::encoder::find(codec::Id::AAC).ok_or_else(|| {
            MediaError::Ffmpeg(FfmpegError::EncoderNotFound(
                "AAC encoder not found in this FFmpeg build".into(),
            ))
        })?;

        let mut context = codec::Context::new_with_codec(codec);
        context.set_time_base(ffmpeg::Rational::new(1, sample_rate as i32));
        if global_header {
            context.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut audio_enc = context.encoder().audio().map_err(|e| {
            MediaError::Ffmpeg(FfmpegError::EncoderConfigure(format!(
                "Cannot get audio encoder handle: {}",
                e
            )))
        })?;

        audio_enc.set_rate(sample_rate as i32);
        audio_enc.set_format(ENCODER_SAMPLE_FMT);
        audio_enc.set_channel_layout(layout_for_channels(channels));
        audio_enc.set_bit_rate(bitrate as usize);

        let encoder = audio_enc.open_as(codec).map_err(|e| {
            MediaError::Ffmpeg(FfmpegError::EncoderConfigure(format!(
                "Failed to open AAC encoder: {}",
                e
            )))
        })?;

        let frame_size = match encoder.frame_size() as usize {
            0 => AAC_FRAME_SIZE,
            n => n,
        };

        Ok(Self {
            encoder,
            frame_size,
            output_timebase: ffmpeg::Rational::new(1, sample_rate as i32),
            pts: 0,
        })
    }

    pub fn send_frame(&mut self, frame: &ffmpeg::util::frame::Audio) -> Result<()> {
        self.encoder
            .send_frame(frame)
            .map_err(|e| encode_err("AAC encoder send_frame", e))
    }

    pub fn send_eof(&mut self) -> Result<()> {
        self.encoder
            .send_eof()
            .map_err(|e| encode_err("AAC encoder send_eof", e))
    }

    /// Receive one encoded AAC packet, or `None` if the encoder needs more
    /// input.  Packets without a pts get one from a running sample counter.
    pub fn receive_packet(&mut self) -> Result<Option<ffmpeg::codec::packet::Packet>> {
        let packet = receive(&mut self.encoder, "AAC encoder receive_packet")?;
        Ok(packet.map(|mut p| {
            if p.pts().is_none() {
                p.set_pts(Some(self.pts));
                p.set_dts(Some(self.pts));
            }
            self.pts += self.frame_size as i64;
            p
        }))
    }

    /// Send EOF and collect all remaining buffered packets.
    pub fn flush(&mut self) -> Result<Vec<ffmpeg::codec::packet::Packet>> {
        self.send_eof()?;
        let mut packets = Vec::new();
        while let Some(p) = self.receive_packet()? {
            packets.push(p);
        }
        Ok(packets)
    }

    /// The number of samples per channel the encoder expects per frame.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// The output timebase (1 / sample_rate).
    pub fn output_timebase(&self) -> ffmpeg::Rational {
        self.output_timebase
    }

    /// Codec parameters for the encoded stream (for muxer stream setup).
    pub fn codec_parameters(&self) -> ffmpeg::codec::Parameters {
        encoder_codec_parameters(&self.encoder)
    }
}

/// Settings for [`H264Encoder::open`].
#[derive(Debug, Clone)]
pub struct VideoEncoderSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub crf: u8,
    pub preset: String,
    pub global_header: bool,
}

/// H.264 encoder.  Uses `libx264` when the FFmpeg build has it, otherwise
/// whichever encoder is registered for `AV_CODEC_ID_H264`.
pub struct H264Encoder {
    encoder: ffmpeg::encoder::Video,
    time_base: ffmpeg::Rational,
}

impl H264Encoder {
    pub fn open(settings: &VideoEncoderSettings) -> Result<Self> {
        let codec = codec::encoder::find_by_name(X264_ENCODER)
            .or_else(|| codec::encoder::find(codec::Id::H264))
            .ok_or_else(|| {
                MediaError::Ffmpeg(FfmpegError::EncoderNotFound(
                    "no H.264 encoder in this FFmpeg build".into(),
                ))
            })?;

        let encoder_name = codec.name().to_string();
        let time_base = ffmpeg::Rational::new(1, settings.frame_rate.max(1) as i32);

        let mut context = codec::Context::new_with_codec(codec);
        if settings.global_header {
            context.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut video_enc = context.encoder().video().map_err(|e| {
            MediaError::Ffmpeg(FfmpegError::EncoderConfigure(format!(
                "Cannot get video encoder handle: {}",
                e
            )))
        })?;

        video_enc.set_width(settings.width);
        video_enc.set_height(settings.height);
        video_enc.set_format(ffmpeg::format::Pixel::YUV420P);
        video_enc.set_time_base(time_base);
        video_enc.set_frame_rate(Some(ffmpeg::Rational::new(settings.frame_rate as i32, 1)));
        video_enc.set_aspect_ratio(ffmpeg::Rational::new(1, 1));

        let mut opts = ffmpeg::Dictionary::new();
        if encoder_name == X264_ENCODER {
            opts.set("crf", &settings.crf.to_string());
            opts.set("preset", &settings.preset);
        }

        let encoder = video_enc.open_as_with(codec, opts).map_err(|e| {
            MediaError::Ffmpeg(FfmpegError::EncoderConfigure(format!(
                "Failed to open {} encoder at {}x{}: {}",
                encoder_name,
                settings.width,
                settings.height,
                e
            )))
        })?;

        tracing::debug!(
            encoder = %encoder_name,
            width = settings.width,
            height = settings.height,
            fps = settings.frame_rate,
            "H.264 encoder opened"
        );

        Ok(Self { encoder, time_base })
    }

    pub fn send_frame(&mut self, frame: &ffmpeg::util::frame::Video) -> Result<()> {
        self.encoder
            .send_frame(frame)
            .map_err(|e| encode_err("H.264 encoder send_frame", e))
    }

    pub fn send_eof(&mut self) -> Result<()> {
        self.encoder
            .send_eof()
            .map_err(|e| encode_err("H.264 encoder send_eof", e))
    }

    pub fn receive_packet(&mut self) -> Result<Option<ffmpeg::codec::packet::Packet>> {
        receive(&mut self.encoder, "H.264 encoder receive_packet")
    }

    /// Encoder timebase (1 / frame rate).  Packets are stamped in it.
    pub fn time_base(&self) -> ffmpeg::Rational {
        self.time_base
    }

    pub fn codec_parameters(&self) -> ffmpeg::codec::Parameters {
        encoder_codec_parameters(&self.encoder)
    }
}

/// Check whether the FFmpeg build includes an AAC encoder.
pub fn is_aac_encoder_available() -> bool {
    codec::encoder::find(codec::Id::AAC).is_some()
}

/// Check whether the FFmpeg build includes any H.264 encoder.
pub fn is_h264_encoder_available() -> bool {
    codec::encoder::find_by_name(X264_ENCODER).is_some()
        || codec::encoder::find(codec::Id::H264).is_some()
}
