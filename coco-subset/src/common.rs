//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context, Error, Result};
pub use bbox::{prelude::*, HW, TLBR};
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::Itertools;
pub use label::Label;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::{HashMap, HashSet},
    fmt,
    fs::{self, File},
    io::{self, BufWriter},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
pub use noisy_float::prelude::R64;
pub use tfrecord::{Example, ExampleWriter, Feature};
pub use tracing::{debug, error, info, info_span, trace, warn};

