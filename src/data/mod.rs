/// Data layer: file eligibility, loading, and the combined dataset.
///
/// Architecture:
/// ```text
///  <dir>/<uni>.csv  <dir>/<uni>.json  ...
///        │
///        ▼
///   ┌──────────┐
///   │ validate │  name + size → FileKind | Rejection
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → Table, drop header echoes, stamp `uni`
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ builder  │  union of every Table → Dataset
///   └──────────┘
/// ```

pub mod builder;
pub mod loader;
pub mod model;
pub mod validate;
