//! File muxer for export output.

use std::path::{Path, PathBuf};

use crate::error::{FfmpegError, Result};
use crate::ffmpeg_utils::helpers::stream_reset_codec_tag;
use ffmpeg_next as ffmpeg;

use super::preset::OutputFileType;

/// Writes encoded packets into an M4A or MOV file.
pub struct FileMuxer {
    output: ffmpeg::format::context::Output,
    path: PathBuf,
    /// Encoder timebase per output stream, indexed by output stream index
    encoder_time_bases: Vec<ffmpeg::Rational>,
    header_written: bool,
}

impl FileMuxer {
    /// Create the output file with the muxer for `file_type`.
    pub fn create(path: &Path, file_type: OutputFileType) -> Result<Self> {
        let output = ffmpeg::format::output_as(&path, file_type.muxer()).map_err(|e| {
            FfmpegError::MuxerCreate(format!(
                "{} muxer for {}: {}",
                file_type.muxer(),
                path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %path.display(), muxer = file_type.muxer(), "created output");

        Ok(Self {
            output,
            path: path.to_path_buf(),
            encoder_time_bases: Vec::new(),
            header_written: false,
        })
    }

    /// Whether encoders feeding this muxer must emit global headers.
    pub fn needs_global_header(&self) -> bool {
        self.output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER)
    }

    /// Add a stream fed by an encoder whose packets are stamped in
    /// `encoder_time_base`.  Returns the output stream index.
    pub fn add_stream(
        &mut self,
        params: ffmpeg::codec::Parameters,
        encoder_time_base: ffmpeg::Rational,
    ) -> Result<usize> {
        let mut out_stream = self
            .output
            .add_stream(ffmpeg::encoder::find(ffmpeg::codec::Id::None))
            .map_err(|e| FfmpegError::StreamConfig(format!("Failed to add stream: {}", e)))?;

        out_stream.set_parameters(params);
        stream_reset_codec_tag(&mut out_stream);
        out_stream.set_time_base(encoder_time_base);

        let index = out_stream.index();
        self.encoder_time_bases.push(encoder_time_base);

        tracing::debug!(
            index,
            time_base = %encoder_time_base,
            "added output stream"
        );
        Ok(index)
    }

    /// Write the container header.  `faststart` moves the index to the front
    /// of the file once the trailer is written.
    pub fn write_header(&mut self, faststart: bool) -> Result<()> {
        let mut opts = ffmpeg::Dictionary::new();
        if faststart {
            opts.set("movflags", "+faststart");
        }
        self.output
            .write_header_with(opts)
            .map_err(|e| FfmpegError::WriteHeader(format!("{}: {}", self.path.display(), e)))?;
        self.header_written = true;
        Ok(())
    }

    /// Write an encoded packet to output stream `index`, rescaling its
    /// timestamps from the encoder timebase to the stream timebase the muxer
    /// settled on.
    pub fn write_packet(&mut self, packet: &mut ffmpeg::Packet, index: usize) -> Result<()> {
        let encoder_tb = self.encoder_time_bases.get(index).copied().ok_or_else(|| {
            FfmpegError::WritePacket(format!("no output stream {}", index))
        })?;
        let stream_tb = self
            .output
            .stream(index)
            .map(|s| s.time_base())
            .ok_or_else(|| FfmpegError::WritePacket(format!("no output stream {}", index)))?;

        packet.set_stream(index);
        packet.set_position(-1);
        packet.rescale_ts(encoder_tb, stream_tb);
        packet
            .write_interleaved(&mut self.output)
            .map_err(|e| FfmpegError::WritePacket(format!("stream {}: {}", index, e)))?;
        Ok(())
    }

    /// Write the trailer and close the file.
    pub fn finish(mut self) -> Result<()> {
        if !self.header_written {
            return Err(FfmpegError::WriteTrailer("header was never written".into()).into());
        }
        self.output
            .write_trailer()
            .map_err(|e| FfmpegError::WriteTrailer(format!("{}: {}", self.path.display(), e)))?;
        tracing::debug!(path = %self.path.display(), "output finalized");
        Ok(())
    }
}
