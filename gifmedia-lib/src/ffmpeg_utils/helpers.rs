//! FFI accessors that `ffmpeg-next` does not wrap.
//!
//! All `unsafe` in the crate outside log routing lives here.

use ffmpeg_next as ffmpeg;

// ── Codec-parameter field accessors ─────────────────────────────────────────

/// Read `sample_rate` from an `AVCodecParameters` struct.
///
/// `ffmpeg-next` does not expose this field through a safe accessor.
pub fn codec_params_sample_rate(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    // SAFETY: `params.as_ptr()` returns a valid non-null pointer for the
    // lifetime of `params`.  `sample_rate` is a plain i32 field with no
    // ownership semantics.
    unsafe { (*params.as_ptr()).sample_rate.max(0) as u32 }
}

/// Read `ch_layout.nb_channels` from an `AVCodecParameters` struct.
pub fn codec_params_channels(params: &ffmpeg::codec::parameters::Parameters) -> u16 {
    // SAFETY: same as `codec_params_sample_rate`.
    unsafe { (*params.as_ptr()).ch_layout.nb_channels.max(0) as u16 }
}

/// Read `width` from an `AVCodecParameters` struct.
pub fn codec_params_width(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    unsafe { (*params.as_ptr()).width.max(0) as u32 }
}

/// Read `height` from an `AVCodecParameters` struct.
pub fn codec_params_height(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    unsafe { (*params.as_ptr()).height.max(0) as u32 }
}

/// Read the display matrix attached to a stream's codec parameters.
///
/// Containers that carry a track transform (the `tkhd` matrix in MOV/MP4)
/// export it as `AV_PKT_DATA_DISPLAYMATRIX` coded side data.  Returns `None`
/// when the stream has no such side data.
pub fn codec_params_display_matrix(
    params: &ffmpeg::codec::parameters::Parameters,
) -> Option<[i32; 9]> {
    // SAFETY: `coded_side_data` / `nb_coded_side_data` describe an array owned
    // by `params` that stays alive for the duration of this call.
    // `av_packet_side_data_get` only walks that array.  The returned entry is
    // checked for null and for holding at least nine i32 values before the
    // data is copied out.
    unsafe {
        let p = params.as_ptr();
        if (*p).coded_side_data.is_null() || (*p).nb_coded_side_data <= 0 {
            return None;
        }
        let sd = ffmpeg::ffi::av_packet_side_data_get(
            (*p).coded_side_data,
            (*p).nb_coded_side_data,
            ffmpeg::ffi::AVPacketSideDataType::AV_PKT_DATA_DISPLAYMATRIX,
        );
        if sd.is_null() || (*sd).data.is_null() {
            return None;
        }
        if (*sd).size < 9 * std::mem::size_of::<i32>() {
            return None;
        }
        let mut matrix = [0i32; 9];
        std::ptr::copy_nonoverlapping(
            (*sd).data as *const u8,
            matrix.as_mut_ptr() as *mut u8,
            9 * std::mem::size_of::<i32>(),
        );
        Some(matrix)
    }
}

/// Zero out `codec_tag` on the `AVCodecParameters` attached to an output
/// stream, so the muxer picks the correct tag for the target container.
///
/// Must be called after `out_stream.set_parameters(...)` and before
/// `write_header`.
pub fn stream_reset_codec_tag(out_stream: &mut ffmpeg::format::stream::StreamMut) {
    // SAFETY: `out_stream.as_mut_ptr()` is valid for the lifetime of the
    // stream.  `codecpar` is set by `set_parameters` and is non-null.
    unsafe {
        (*(*out_stream.as_mut_ptr()).codecpar).codec_tag = 0;
    }
}

/// Allocate a fresh `AVCodecParameters`, copy an opened encoder context into
/// it, and return it as a safe `ffmpeg::codec::Parameters`.
///
/// Used for muxer stream setup of both the audio and the video encoder.
pub fn encoder_codec_parameters(ctx: &ffmpeg::codec::Context) -> ffmpeg::codec::Parameters {
    use std::rc::Rc;
    // SAFETY: `avcodec_parameters_alloc` returns a valid pointer or null; the
    // null case only happens under OOM.  `avcodec_parameters_from_context`
    // copies fields from a live encoder context.
    unsafe {
        let params = ffmpeg::ffi::avcodec_parameters_alloc();
        ffmpeg::ffi::avcodec_parameters_from_context(params, ctx.as_ptr());
        ffmpeg::codec::Parameters::wrap(params, None::<Rc<dyn std::any::Any>>)
    }
}

// ── Filter graph ────────────────────────────────────────────────────────────

/// Timebase of the frames a `buffersink` filter produces.
pub fn buffersink_time_base(sink: &ffmpeg::filter::Context) -> ffmpeg::Rational {
    // SAFETY: `sink.as_ptr()` points to a configured buffersink owned by a
    // validated graph that outlives this call.
    unsafe { ffmpeg::ffi::av_buffersink_get_time_base(sink.as_ptr() as *mut _).into() }
}

// ── Planar float audio ──────────────────────────────────────────────────────

/// Base pointer and byte length of plane `index`.
///
/// `ffmpeg-next`'s `Audio::data(index)` stops counting planes when
/// `linesize[1] == 0`, which planar frames usually leave unset.  Every plane
/// is `linesize[0]` bytes long.
fn audio_plane(frame: &ffmpeg::util::frame::Audio, index: usize) -> Option<(*mut u8, usize)> {
    // SAFETY: `frame` owns a live AVFrame.  `extended_data` holds one pointer
    // per plane, and `index` is bounds-checked against the plane count first.
    unsafe {
        let f = frame.as_ptr();
        let planes = if frame.format().is_planar() {
            (*f).ch_layout.nb_channels.max(0) as usize
        } else {
            1
        };
        if index >= planes || (*f).extended_data.is_null() {
            return None;
        }
        let ptr = *(*f).extended_data.add(index);
        (!ptr.is_null()).then(|| (ptr, (*f).linesize[0].max(0) as usize))
    }
}

/// Whether `samples` f32 values fit at `ptr` within `len` bytes.
fn f32_view_fits(ptr: *const u8, len: usize, samples: usize) -> bool {
    samples
        .checked_mul(std::mem::size_of::<f32>())
        .is_some_and(|bytes| bytes <= len)
        && (ptr as usize).is_multiple_of(std::mem::align_of::<f32>())
}

/// First `samples` values of an FLTP plane.  `None` when the plane is
/// missing, shorter than `samples`, or misaligned.
pub fn audio_plane_f32(
    frame: &ffmpeg::util::frame::Audio,
    index: usize,
    samples: usize,
) -> Option<&[f32]> {
    let (ptr, len) = audio_plane(frame, index)?;
    if !f32_view_fits(ptr, len, samples) {
        return None;
    }
    // SAFETY: length and alignment checked above; the plane lives as long
    // as the borrowed frame.
    Some(unsafe { std::slice::from_raw_parts(ptr as *const f32, samples) })
}

/// Mutable version of [`audio_plane_f32`].
pub fn audio_plane_f32_mut(
    frame: &mut ffmpeg::util::frame::Audio,
    index: usize,
    samples: usize,
) -> Option<&mut [f32]> {
    let (ptr, len) = audio_plane(frame, index)?;
    if !f32_view_fits(ptr, len, samples) {
        return None;
    }
    // SAFETY: as above, and `frame` is borrowed mutably for the slice's life.
    Some(unsafe { std::slice::from_raw_parts_mut(ptr as *mut f32, samples) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_view_bounds() {
        let floats = [0.5f32, -1.0, 0.25];
        let ptr = floats.as_ptr() as *const u8;
        assert!(f32_view_fits(ptr, 12, 3));
        assert!(!f32_view_fits(ptr, 11, 3));
        assert!(!f32_view_fits(ptr, 12, usize::MAX));
        assert!(!f32_view_fits(ptr.wrapping_add(1), 12, 2));
    }

    #[test]
    fn test_audio_plane_f32_reads_planes() {
        let layout = ffmpeg::util::channel_layout::ChannelLayout::STEREO;
        let fltp = ffmpeg::util::format::sample::Sample::F32(
            ffmpeg::util::format::sample::Type::Planar,
        );
        let mut frame = ffmpeg::util::frame::Audio::new(fltp, 4, layout);
        audio_plane_f32_mut(&mut frame, 1, 4)
            .unwrap()
            .copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(audio_plane_f32(&frame, 1, 4).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(audio_plane_f32(&frame, 2, 4).is_none());
    }
}
