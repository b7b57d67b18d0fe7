//! Tests for niimaqsrc
//!
//! Caps and timestamping are tested directly. Element tests register the
//! plugin statically and inject a [`MockDriver`], so no frame grabber is
//! needed.

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, Once};

use gst::prelude::*;
use gst::subclass::prelude::*;
use gst_base::prelude::*;
use gst_base::subclass::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;
use imaq::CameraFormat;
use imaq::mock::{MockCamera, MockDriver};
use tracing_test::traced_test;

use crate::niimaqsrc::NiImaqSrc;
use crate::niimaqsrc::caps::{
    CapsError, LITTLE_ENDIAN, advertised_formats, camera_caps, parse_negotiated,
};
use crate::niimaqsrc::state::FrameClock;

static INIT: Once = Once::new();

fn init() {
    INIT.call_once(|| {
        gst::init().unwrap();
        crate::plugin_register_static().unwrap();
    });
}

fn make_src(mock: &Arc<MockDriver>) -> gst::Element {
    init();
    let src = gst::ElementFactory::make("niimaqsrc").build().unwrap();
    src.clone()
        .downcast::<NiImaqSrc>()
        .unwrap()
        .set_driver(mock.clone());
    src
}

#[test]
fn advertised_formats_cover_both_grayscale_layouts() {
    init();
    let caps = advertised_formats();

    assert_eq!(caps.size(), 2);

    let gray8 = caps.structure(0).unwrap();
    assert_eq!(gray8.get::<&str>("format").unwrap(), "GRAY8");
    assert_eq!(gray8.get::<i32>("bpp").unwrap(), 8);
    assert_eq!(gray8.get::<i32>("depth").unwrap(), 8);

    let gray16 = caps.structure(1).unwrap();
    assert_eq!(gray16.get::<&str>("format").unwrap(), "GRAY16_LE");
    assert_eq!(gray16.get::<i32>("depth").unwrap(), 16);
    assert_eq!(gray16.get::<i32>("endianness").unwrap(), LITTLE_ENDIAN);
}

#[test]
fn concrete_caps_parse_back_to_the_same_values() {
    init();
    let concrete = gst::Caps::builder("video/x-raw")
        .field("format", "GRAY16_LE")
        .field("bpp", 12i32)
        .field("depth", 16i32)
        .field("endianness", LITTLE_ENDIAN)
        .field("width", 640i32)
        .field("height", 480i32)
        .field("framerate", gst::Fraction::new(25, 1))
        .build();

    let negotiated = advertised_formats().intersect(&concrete);
    assert!(negotiated.is_fixed());

    let format = parse_negotiated(&negotiated).unwrap();
    assert_eq!(format.width, 640);
    assert_eq!(format.height, 480);
    assert_eq!(format.bpp, 12);
    assert_eq!(format.depth, 16);
    assert_eq!((format.rate_num, format.rate_den), (25, 1));
    assert_eq!(format.frame_size(), 640 * 480 * 2);
}

#[test]
fn missing_framerate_is_reported() {
    init();
    let caps = gst::Caps::builder("video/x-raw")
        .field("format", "GRAY8")
        .field("bpp", 8i32)
        .field("depth", 8i32)
        .field("width", 320i32)
        .field("height", 240i32)
        .build();

    assert_eq!(
        parse_negotiated(&caps),
        Err(CapsError::MissingField("framerate"))
    );
}

#[test]
fn empty_caps_are_reported() {
    init();
    assert_eq!(
        parse_negotiated(&gst::Caps::new_empty()),
        Err(CapsError::Empty)
    );
}

#[test]
fn camera_caps_follow_the_storage_depth() {
    init();
    let wide = camera_caps(&CameraFormat {
        width: 1024,
        height: 768,
        bits_per_pixel: 10,
        depth: 16,
    });
    let s = wide.structure(0).unwrap();
    assert_eq!(s.get::<&str>("format").unwrap(), "GRAY16_LE");
    assert_eq!(s.get::<i32>("endianness").unwrap(), LITTLE_ENDIAN);
    assert_eq!(s.get::<i32>("width").unwrap(), 1024);
    assert_eq!(s.get::<i32>("bpp").unwrap(), 10);
    assert!(s.has_field("framerate"));

    let narrow = camera_caps(&CameraFormat {
        width: 1024,
        height: 768,
        bits_per_pixel: 8,
        depth: 8,
    });
    let s = narrow.structure(0).unwrap();
    assert_eq!(s.get::<&str>("format").unwrap(), "GRAY8");
    assert!(!s.has_field("endianness"));
    assert!(narrow.can_intersect(&advertised_formats()));
}

#[traced_test]
#[test]
fn frame_clock_starts_at_the_running_time_of_the_first_frame() {
    init();
    let ms = gst::ClockTime::from_mseconds;
    let mut clock = FrameClock::new(5_000_000, gst::Fraction::new(25, 1));

    assert_eq!(clock.frame_period(), Some(ms(40)));

    let first = clock.timestamp(0, Some(ms(1_000)));
    assert_eq!(first.pts, ms(1_005));
    assert_eq!(first.duration, Some(ms(40)));

    // Frames read early stay on the frame-rate timeline.
    assert_eq!(clock.timestamp(3, Some(ms(1_050))).pts, ms(1_125));
}

#[traced_test]
#[test]
fn frame_clock_anchors_on_the_first_sequence_number() {
    init();
    let ms = gst::ClockTime::from_mseconds;
    let mut clock = FrameClock::new(0, gst::Fraction::new(25, 1));

    assert_eq!(clock.timestamp(5, Some(ms(200))).pts, ms(200));
    assert_eq!(clock.timestamp(6, Some(ms(210))).pts, ms(240));
    assert_eq!(clock.timestamp(8, Some(ms(250))).pts, ms(320));
}

#[traced_test]
#[test]
fn frame_clock_moves_forward_when_frames_would_be_late() {
    init();
    let ms = gst::ClockTime::from_mseconds;
    let mut clock = FrameClock::new(0, gst::Fraction::new(25, 1));

    assert_eq!(clock.timestamp(0, Some(ms(1_000))).pts, ms(1_000));
    // A camera slower than the negotiated rate must not produce late buffers.
    assert_eq!(clock.timestamp(1, Some(ms(1_100))).pts, ms(1_100));
    assert_eq!(clock.timestamp(2, Some(ms(1_110))).pts, ms(1_140));
    assert_eq!(clock.timestamp(3, Some(ms(1_300))).pts, ms(1_300));
}

#[traced_test]
#[test]
fn frame_clock_saturates_negative_offsets() {
    init();
    let ms = gst::ClockTime::from_mseconds;
    let mut clock = FrameClock::new(-50_000_000, gst::Fraction::new(25, 1));

    assert_eq!(clock.timestamp(0, Some(gst::ClockTime::ZERO)).pts, gst::ClockTime::ZERO);
    assert_eq!(clock.timestamp(1, Some(ms(10))).pts, gst::ClockTime::ZERO);
    assert_eq!(clock.timestamp(2, Some(ms(20))).pts, ms(30));
}

#[traced_test]
#[test]
fn frame_clock_without_rate_uses_the_running_time() {
    init();
    let ms = gst::ClockTime::from_mseconds;
    let mut clock = FrameClock::new(0, gst::Fraction::new(0, 1));

    assert_eq!(clock.frame_period(), None);

    let first = clock.timestamp(0, Some(ms(1_000)));
    assert_eq!(first.pts, ms(1_000));
    assert_eq!(first.duration, None);

    assert_eq!(clock.timestamp(1, Some(ms(1_040))).pts, ms(1_040));
    // Running time going backwards must not move timestamps backwards.
    assert_eq!(clock.timestamp(2, Some(ms(1_010))).pts, ms(1_040));
    assert_eq!(clock.timestamp(3, Some(ms(1_100))).pts, ms(1_100));
}

#[test]
fn live_buffers_sync_on_their_timestamps() {
    let mock = Arc::new(MockDriver::new());
    let src = make_src(&mock);
    let niimaq = src.downcast_ref::<NiImaqSrc>().unwrap();
    let ms = gst::ClockTime::from_mseconds;

    let mut buffer = gst::Buffer::new();
    {
        let buffer = buffer.get_mut().unwrap();
        buffer.set_pts(ms(100));
        buffer.set_duration(ms(40));
    }
    assert_eq!(niimaq.imp().times(&buffer), (Some(ms(100)), Some(ms(140))));

    let untimed = gst::Buffer::new();
    assert_eq!(niimaq.imp().times(&untimed), (None, None));

    niimaq.set_live(false);
    assert_eq!(niimaq.imp().times(&buffer), (None, None));
}

#[test]
fn properties_have_their_defaults() {
    let mock = Arc::new(MockDriver::new());
    let src = make_src(&mock);

    assert_eq!(src.property::<String>("interface"), "img0");
    assert_eq!(src.property::<i64>("timestamp-offset"), 0);
    assert_eq!(src.property::<i32>("buffer-size"), 10);
    assert_eq!(src.property::<u64>("frames"), 0);
    assert_eq!(src.property::<u64>("dropped-frames"), 0);

    src.set_property("interface", "img1::0");
    src.set_property("buffer-size", 32i32);
    assert_eq!(src.property::<String>("interface"), "img1::0");
    assert_eq!(src.property::<i32>("buffer-size"), 32);
}

#[test]
fn interfaces_property_lists_enumerated_ports() {
    let mock = Arc::new(
        MockDriver::new()
            .with_interface("img0", 1)
            .with_interface("img1", 2),
    );
    let src = make_src(&mock);

    let interfaces = src.property::<gst::Array>("interfaces");
    let names: Vec<String> = interfaces
        .iter()
        .map(|value| value.get::<String>().unwrap())
        .collect();

    assert_eq!(names, ["img0", "img1::0", "img1::1"]);
    assert_eq!(mock.open_interface_count(), 0);
}

#[test]
fn start_on_missing_interface_fails_cleanly() {
    let mock = Arc::new(MockDriver::new().with_interface("img0", 1));
    let src = make_src(&mock);
    src.set_property("interface", "img7");

    assert!(src.set_state(gst::State::Paused).is_err());
    src.set_state(gst::State::Null).unwrap();

    assert_eq!(mock.open_interface_count(), 0);
    assert_eq!(mock.open_session_count(), 0);
}

#[test]
fn pipeline_delivers_timestamped_frames() {
    let mock = Arc::new(
        MockDriver::new()
            .with_interface("img0", 1)
            .with_camera(MockCamera {
                width: 32,
                height: 16,
                bits_per_pixel: 12,
                bytes_per_pixel: 2,
            })
            .with_sequences([0, 1, 3, 4, 5]),
    );
    let src = make_src(&mock);
    src.set_property("num-buffers", 5i32);
    src.set_property("buffer-size", 4i32);
    let sink = gst::ElementFactory::make("fakesink").build().unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let captured = seen.clone();
    src.static_pad("src")
        .unwrap()
        .add_probe(gst::PadProbeType::BUFFER, move |_, info| {
            if let Some(gst::PadProbeData::Buffer(ref buffer)) = info.data {
                captured.lock().unwrap().push((
                    buffer.pts(),
                    buffer.offset(),
                    buffer.flags().contains(gst::BufferFlags::DISCONT),
                    buffer.size(),
                ));
            }
            gst::PadProbeReturn::Ok
        });

    let pipeline = gst::Pipeline::new();
    pipeline.add_many([&src, &sink]).unwrap();
    src.link(&sink).unwrap();

    pipeline.set_state(gst::State::Playing).unwrap();
    let bus = pipeline.bus().unwrap();
    let msg = bus
        .timed_pop_filtered(
            gst::ClockTime::from_seconds(10),
            &[gst::MessageType::Eos, gst::MessageType::Error],
        )
        .unwrap();
    assert_eq!(msg.type_(), gst::MessageType::Eos);

    // The camera reports no frame rate and none is invented.
    let caps = src.static_pad("src").unwrap().current_caps().unwrap();
    let s = caps.structure(0).unwrap();
    assert_eq!(s.get::<&str>("format").unwrap(), "GRAY16_LE");
    assert_eq!(
        s.get::<gst::Fraction>("framerate").unwrap(),
        gst::Fraction::new(0, 1)
    );

    pipeline.set_state(gst::State::Null).unwrap();

    let seen = seen.lock().unwrap();
    let offsets: Vec<u64> = seen.iter().map(|(_, offset, _, _)| *offset).collect();
    let discont: Vec<bool> = seen.iter().map(|(_, _, discont, _)| *discont).collect();
    assert_eq!(offsets, [0, 1, 3, 4, 5]);
    assert_eq!(discont, [true, false, true, false, false]);
    assert!(seen.iter().all(|(_, _, _, size)| *size == 32 * 16 * 2));
    let pts: Vec<gst::ClockTime> = seen.iter().map(|(pts, _, _, _)| pts.unwrap()).collect();
    assert!(pts.windows(2).all(|pair| pair[0] <= pair[1]));

    assert_eq!(src.property::<u64>("frames"), 5);
    assert_eq!(src.property::<u64>("dropped-frames"), 1);
    assert_eq!(mock.open_interface_count(), 0);
    assert_eq!(mock.open_session_count(), 0);
}

#[test]
fn negotiated_frame_rate_sets_durations() {
    let mock = Arc::new(MockDriver::new().with_interface("img0", 1));
    let src = make_src(&mock);
    src.set_property("num-buffers", 3i32);
    let filter = gst::ElementFactory::make("capsfilter")
        .property(
            "caps",
            gst::Caps::builder("video/x-raw")
                .field("framerate", gst::Fraction::new(25, 1))
                .build(),
        )
        .build()
        .unwrap();
    let sink = gst::ElementFactory::make("fakesink").build().unwrap();

    let durations = Arc::new(Mutex::new(Vec::new()));
    let captured_durations = durations.clone();
    src.static_pad("src")
        .unwrap()
        .add_probe(gst::PadProbeType::BUFFER, move |_, info| {
            if let Some(gst::PadProbeData::Buffer(ref buffer)) = info.data {
                captured_durations.lock().unwrap().push(buffer.duration());
            }
            gst::PadProbeReturn::Ok
        });

    let pipeline = gst::Pipeline::new();
    pipeline.add_many([&src, &filter, &sink]).unwrap();
    gst::Element::link_many([&src, &filter, &sink]).unwrap();

    pipeline.set_state(gst::State::Playing).unwrap();
    let msg = pipeline
        .bus()
        .unwrap()
        .timed_pop_filtered(
            gst::ClockTime::from_seconds(10),
            &[gst::MessageType::Eos, gst::MessageType::Error],
        )
        .unwrap();
    assert_eq!(msg.type_(), gst::MessageType::Eos);
    pipeline.set_state(gst::State::Null).unwrap();

    let durations = durations.lock().unwrap();
    assert_eq!(durations.len(), 3);
    assert!(
        durations
            .iter()
            .all(|duration| *duration == Some(gst::ClockTime::from_mseconds(40)))
    );
    assert_eq!(mock.open_session_count(), 0);
}

#[test]
fn element_metadata_names_this_project() {
    init();
    let factory = gst::ElementFactory::find("niimaqsrc").unwrap();
    assert_eq!(
        factory.metadata(gst::ELEMENT_METADATA_AUTHOR),
        Some("gst-niimaq contributors")
    );
    assert_eq!(
        factory.metadata(gst::ELEMENT_METADATA_KLASS),
        Some("Source/Video")
    );

    let plugin = factory.plugin().unwrap();
    assert!(!plugin.origin().contains("dmf-mxl"));
}
