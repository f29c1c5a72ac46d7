pub use std::{path::PathBuf, time::Duration};

pub use anyhow::{Context, bail};
pub use migration::{Applier, Error, Patch, Report};
pub use sea_orm::{ConnectOptions, Database, DatabaseConnection};
pub use tracing::{error, info, warn};

pub use crate::config::Config;
