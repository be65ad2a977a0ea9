//! Audio rule validators
//!
//! Each rule reads the metadata record and the discovered files and either
//! writes warnings to the step's ledger or aborts with a fatal error.

pub mod downsample;
pub mod duplicates;
pub mod filename_length;
pub mod homogeneity;
pub mod plausibility;
pub mod sort_order;
pub mod tag_completeness;

pub use downsample::check_downsample;
pub use duplicates::check_duplicates;
pub use filename_length::shorten_filename_if_necessary;
pub use homogeneity::common_stream;
pub use plausibility::check_metadata_plausibility;
pub use sort_order::check_track_sort_order;
pub use tag_completeness::check_tag_completeness;
