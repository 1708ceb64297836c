//! Decoder for multi-plane time-of-flight sensor recordings.
//!
//! A recording is a sequence of `[marker][size][payload]` records.  Each
//! frame payload holds a metadata block followed by depth, active-brightness
//! (AB), optional confidence, optional XYZ and optional NV12 colour planes.
//!
//! ```text
//! Recording ──locate──▶ payload ──FrameDecoder──▶ DecodedFrame
//!                                   │ metadata      ├─ planes (u16 / i16×3 / nv12)
//!                                   │ layout        ├─ RgbImage
//!                                   │ planes        ├─ PointCloud
//!                                                   └─ per-plane status
//! ```

pub mod error;
pub mod cursor;
pub mod record;
pub mod header;
pub mod metadata;
pub mod container;
pub mod layout;
pub mod plane;
pub mod color;
pub mod pointcloud;
pub mod encode;
pub mod options;
pub mod frame;
pub mod batch;
pub mod export;
pub mod logger;

pub use error::{DecodeError, Result};
pub use cursor::ByteCursor;
pub use record::{FormatRevision, RecordHeader};
pub use header::ContainerHeader;
pub use metadata::FrameMetadata;
pub use container::{locate_frame, FrameLocation, RawFrame, Recording};
pub use container::scanner::{scan, ScanReport};
pub use container::writer::{FramePayloadBuilder, RecordingWriter};
pub use layout::{resolve, LayoutOverrides, LayoutVariant, PlaneDescriptor, PlaneKind};
pub use plane::{DecodedPlane, PlaneData};
pub use color::{nv12_to_rgb, RgbImage};
pub use pointcloud::{Point3D, PointCloud};
pub use encode::{Image8, Palette};
pub use options::{Config, DecodeOptions, ExportOptions, FrameRange};
pub use frame::{DecodedFrame, FrameDecoder, LiveFrame, PlaneStatus};
pub use export::FrameExporter;
