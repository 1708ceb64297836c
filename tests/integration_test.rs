use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

use tofraw::batch;
use tofraw::container::scanner;
use tofraw::frame::InMemoryLiveFrame;
use tofraw::layout::{nv12_len, PlaneKind};
use tofraw::{
    locate_frame, DecodeError, DecodeOptions, ExportOptions, FormatRevision, FrameDecoder,
    FrameExporter, FrameMetadata, FramePayloadBuilder, FrameRange, PlaneStatus, Recording,
    RecordingWriter,
};

const QMP_W: u16 = 512;
const QMP_H: u16 = 2;

fn qmp_metadata(frame_number: u32) -> FrameMetadata {
    FrameMetadata {
        width: QMP_W,
        height: QMP_H,
        frame_number,
        bits_in_depth: 16,
        bits_in_ab: 16,
        xyz_enabled: true,
        rgb_enabled: true,
        rgb_width: 4,
        rgb_height: 2,
        ..Default::default()
    }
}

/// Full QMP frame: depth, AB, split-halves confidence, XYZ with one valid
/// point, reported NV12 plane.
fn qmp_frame(frame_number: u32, with_ab: bool) -> Vec<u8> {
    let px = QMP_W as usize * QMP_H as usize;
    let depth: Vec<u16> = (0..px as u16).collect();
    let ab = vec![frame_number as u16 + 1; px];
    let conf: Vec<u16> = (0..px).map(|i| (i % 7) as u16).collect();
    let mut xyz = vec![0i16; px * 3];
    xyz[3..6].copy_from_slice(&[10, -5, 3]);
    let mut nv12 = vec![81u8; 8];
    nv12.extend_from_slice(&[90, 240, 90, 240]);

    let b = FramePayloadBuilder::new(qmp_metadata(frame_number)).u16_plane(&depth);
    let b = if with_ab { b.u16_plane(&ab) } else { b };
    b.u16_plane(&conf).i16_plane(&xyz).bytes(&nv12).build()
}

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}

fn recording(frames: &[Vec<u8>], revision: FormatRevision) -> Vec<u8> {
    let mut w = RecordingWriter::new(Vec::new(), &[]).unwrap();
    for f in frames {
        w.write_frame(revision, f).unwrap();
    }
    w.finish().unwrap()
}

#[test]
fn test_locate_second_of_three_records() {
    let frames = vec![vec![0u8; 100], vec![1u8; 150], vec![2u8; 120]];
    let file = recording(&frames, FormatRevision::V1);

    let loc = locate_frame(&file, 8, 1).unwrap();
    assert_eq!((loc.payload_offset, loc.payload_length), (124, 150));
    assert_eq!(
        locate_frame(&file, 8, 3).unwrap_err(),
        DecodeError::FrameNotFound { index: 3, available: 3 }
    );
}

#[test]
fn test_qmp_recording_decodes_every_plane() {
    let file = write_temp(&recording(&[qmp_frame(0, true), qmp_frame(1, true)], FormatRevision::V2));
    let rec = Recording::open(file.path()).unwrap();
    assert!(!rec.is_degraded());
    assert_eq!(rec.frame_count().unwrap(), 2);

    let frame = FrameDecoder::default().decode_at(&rec, 1).unwrap();
    assert!(frame.is_complete(), "skipped: {:?}", frame.skipped());
    for kind in PlaneKind::ALL {
        assert_eq!(frame.status(kind), &PlaneStatus::Decoded, "{kind}");
    }
    assert_eq!(frame.plane(PlaneKind::Depth).unwrap().at(3, 1), Some(515));
    assert_eq!(frame.plane(PlaneKind::Ab).unwrap().at(0, 0), Some(2));
    assert_eq!(frame.plane(PlaneKind::Confidence).unwrap().at(6, 0), Some(6));

    let cloud = frame.point_cloud.as_ref().unwrap();
    assert_eq!(cloud.len(), 1);
    assert_eq!(cloud.stats.min, Some([10, 5, -3]));

    let rgb = frame.rgb.as_ref().unwrap();
    let red = rgb.pixel(0, 0).unwrap();
    assert!(red[0] > 200 && red[1] < 40 && red[2] < 40, "{red:?}");
}

#[test]
fn test_missing_plane_is_reported_and_batch_continues() {
    let frames = vec![qmp_frame(0, true), qmp_frame(1, false), qmp_frame(2, true)];
    let rec = Recording::from_bytes(recording(&frames, FormatRevision::V2)).unwrap();

    let (reports, summary) = batch::decode_range(&rec, &FrameDecoder::default(), FrameRange::all());
    assert_eq!(reports.len(), 3);
    assert!(summary.aborted.is_none());
    assert_eq!(summary.frames_with_skips(), 1);

    // Without AB every later plane runs past the shorter region.
    let broken = &reports[1].frame;
    assert!(broken.status(PlaneKind::Depth).is_decoded());
    assert!(matches!(
        broken.status(PlaneKind::Rgb),
        PlaneStatus::Skipped(DecodeError::PlaneLayoutMismatch { plane: PlaneKind::Rgb, .. })
    ));
    assert!(reports[2].frame.is_complete());
}

#[test]
fn test_extract_writes_rawparser_style_files() {
    let file = write_temp(&recording(&[qmp_frame(0, true), qmp_frame(1, true)], FormatRevision::V2));
    let out = tempfile::tempdir().unwrap();
    let rec = Recording::open(file.path()).unwrap();
    let exporter = FrameExporter::new(out.path(), "capture", ExportOptions { log_ab: true, ..Default::default() });

    let summary = batch::decode_each(&rec, &FrameDecoder::default(), "1-".parse().unwrap(), |r| {
        exporter.export(r.index, &r.frame).map(|_| ())
    })
    .unwrap();
    assert_eq!(summary.decoded(), 1);

    let dir = out.path().join("capture_1");
    for name in [
        "metadata_capture_1.txt",
        "depth_capture_1.png",
        "ab_capture_1.png",
        "conf_capture_1.png",
        "pointcloud_capture_1.ply",
        "rgb_capture_1.jpg",
    ] {
        assert!(dir.join(name).is_file(), "missing {name}");
    }
    assert!(!out.path().join("capture_0").exists());

    let ply = fs::read_to_string(dir.join("pointcloud_capture_1.ply")).unwrap();
    assert!(ply.contains("element vertex 1\n"));
    assert!(ply.ends_with("end_header\n10 5 -3\n"));

    let meta = fs::read_to_string(dir.join("metadata_capture_1.txt")).unwrap();
    assert!(meta.contains("frameWidth: 512\n"));
    assert!(meta.contains("frameNumber: 1\n"));

    let depth = image::open(dir.join("depth_capture_1.png")).unwrap();
    assert_eq!((depth.width(), depth.height()), (QMP_W as u32, QMP_H as u32));
}

#[test]
fn test_megapixel_frame_with_trailing_rgb() {
    let md = FrameMetadata { width: 1024, height: 1, rgb_width: 4, rgb_height: 2, ..Default::default() };
    let nv12 = vec![128u8; nv12_len(4, 2)];
    let payload = FramePayloadBuilder::new(md)
        .u16_plane(&vec![7u16; 1024])
        .u16_plane(&vec![9u16; 1024])
        .bytes(&nv12)
        .build();
    let rec = Recording::from_bytes(recording(&[payload], FormatRevision::V1)).unwrap();
    let frame = FrameDecoder::default().decode_at(&rec, 0).unwrap();

    assert_eq!(frame.planes.len(), 3);
    assert_eq!(frame.status(PlaneKind::Confidence), &PlaneStatus::Absent);
    assert_eq!(frame.status(PlaneKind::Xyz), &PlaneStatus::Absent);
    assert_eq!(frame.rgb.as_ref().unwrap().pixel(3, 1), Some([128, 128, 128]));
}

#[test]
fn test_headerless_recording_uses_fallback_dimensions() {
    let md = FrameMetadata { width: 0, height: 0, ..Default::default() };
    let payload = FramePayloadBuilder::new(md).u16_plane(&[1, 2, 3, 4]).u16_plane(&[5, 6, 7, 8]).build();
    let mut w = RecordingWriter::headerless(Vec::new());
    w.write_frame(FormatRevision::V2, &payload).unwrap();
    let rec = Recording::from_bytes(w.finish().unwrap()).unwrap();
    assert!(rec.is_degraded());

    let frame = FrameDecoder::default().decode_at(&rec, 0).unwrap();
    assert!(frame.degraded);
    assert!(frame.planes.is_empty());
    assert!(matches!(
        frame.status(PlaneKind::Ab),
        PlaneStatus::Skipped(DecodeError::MissingDimensions { .. })
    ));

    let decoder = FrameDecoder::new(DecodeOptions { fallback_dimensions: Some((2, 2)), ..Default::default() });
    let frame = decoder.decode_at(&rec, 0).unwrap();
    assert_eq!(frame.plane(PlaneKind::Depth).unwrap().row(1).unwrap(), &[3, 4]);
    assert_eq!(frame.plane(PlaneKind::Ab).unwrap().row(0).unwrap(), &[5, 6]);
}

#[test]
fn test_scan_skips_unknown_records() {
    let mut w = RecordingWriter::new(Vec::new(), b"sdk").unwrap();
    w.write_frame(FormatRevision::V1, &qmp_frame(0, true)).unwrap();
    w.write_record(0x5EED_F00D, &[0u8; 33]).unwrap();
    w.write_frame(FormatRevision::V2, &qmp_frame(1, true)).unwrap();
    let file = w.finish().unwrap();

    let report = scanner::scan(&file).unwrap();
    assert_eq!(report.frame_records, 2);
    assert_eq!(report.unknown_records, 1);
    assert!(!report.truncated);

    // The strict walk refuses the same file.
    let rec = Recording::from_bytes(file).unwrap();
    assert!(rec.frame(0).is_ok());
    assert!(matches!(rec.frame(1), Err(DecodeError::CorruptContainer { .. })));
}

#[test]
fn test_live_frame_matches_recorded_frame() {
    let payload = qmp_frame(4, true);
    let recorded = FrameDecoder::default().decode(&payload, FormatRevision::V2, false).unwrap();

    let mut live = InMemoryLiveFrame::new(recorded.metadata.clone());
    let layout = recorded.layout.as_ref().unwrap();
    let region = &payload[tofraw::metadata::METADATA_LENGTH..];
    for desc in layout.descriptors() {
        live = live.with_plane(desc.kind, region[desc.byte_offset..desc.end()].to_vec());
    }
    let from_live = FrameDecoder::default().decode_live(&live);

    assert_eq!(from_live.planes, recorded.planes);
    assert_eq!(from_live.rgb, recorded.rgb);
    assert_eq!(from_live.point_cloud, recorded.point_cloud);
}
