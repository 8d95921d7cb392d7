//! Small on-disk dataset shared by tests.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::Properties;
use crate::context::RunContext;

pub const USERS: &str = "u1\nu2\nu3\nu4\n";
pub const ITEMS: &str = "i1\ni2\ni3\ni4\ni5\ni6\n";

pub const TRAIN: &str = "\
u1\ti1\t5
u1\ti2\t3
u1\ti3\t4
u2\ti1\t4
u2\ti2\t5
u2\ti4\t2
u3\ti3\t5
u3\ti4\t4
u3\ti5\t3
u4\ti2\t4
u4\ti5\t5
u4\ti6\t1
";

pub const TEST: &str = "\
u1\ti4\t4
u1\ti5\t2
u2\ti3\t5
u3\ti1\t4
u3\ti6\t2
u4\ti1\t5
u4\ti3\t3
";

pub const GENRES: &str = "i1\tdrama\ni3\tcomedy\ni5\tdrama\n";

/// A dataset in a temporary directory with a context over it.
pub struct Fixture {
    pub dir: TempDir,
    pub ctx: Arc<RunContext>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("users.txt"), USERS).unwrap();
        fs::write(root.join("items.txt"), ITEMS).unwrap();
        fs::write(root.join("train.data"), TRAIN).unwrap();
        fs::write(root.join("test.data"), TEST).unwrap();
        fs::create_dir_all(root.join("features")).unwrap();
        fs::write(root.join("features/genre.txt"), GENRES).unwrap();

        let ctx = Arc::new(RunContext::new(Properties::with_base(root)));
        Self { dir, ctx }
    }
}
