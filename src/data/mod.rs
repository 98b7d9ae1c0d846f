/// Data layer: force samples, loading, and normalisation.
///
/// Architecture:
/// ```text
///  .csv / .tsv  (instrument export)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse columns → RawTrace
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  sign fix, approach trim, unit conversion
///   └───────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ SignalStore   │  strictly ordered (position, force) samples
///   └──────────────┘
/// ```

pub mod loader;
pub mod model;
pub mod normalize;
