//! Property tests for write buffering and commit.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;

use kiln::application::WriteOptions;
use kiln::{CompilerSystem, InMemoryFileSystem, MemorySystem};

const PATHS: [&str; 4] = ["/out/a.js", "/out/b.js", "/out/sub/c.js", "/out/sub/deep/d.css"];

#[derive(Debug, Clone)]
struct WriteOp {
    path: usize,
    content: String,
    in_memory: bool,
}

fn write_op() -> impl Strategy<Value = WriteOp> {
    (0..PATHS.len(), "[a-z ]{0,12}", proptest::bool::weighted(0.2)).prop_map(
        |(path, content, in_memory)| WriteOp {
            path,
            content,
            in_memory,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Nothing buffered reaches the backing store before commit,
    /// and after commit the store holds the last buffered content per path.
    #[test]
    fn property_commit_flushes_last_write(ops in proptest::collection::vec(write_op(), 1..24)) {
        let sys = Arc::new(MemorySystem::new());
        let fs = InMemoryFileSystem::new(sys.clone());

        let mut last: BTreeMap<usize, (String, bool)> = BTreeMap::new();
        for op in &ops {
            let opts = if op.in_memory { WriteOptions::in_memory() } else { WriteOptions::default() };
            fs.write_file(&PathBuf::from(PATHS[op.path]), &op.content, opts).unwrap();
            last.insert(op.path, (op.content.clone(), op.in_memory));
        }
        prop_assert!(sys.file_paths().is_empty());

        let entries = fs.commit().unwrap();

        let flushed: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
        let expected: Vec<PathBuf> = last
            .iter()
            .filter(|(_, (_, in_memory))| !in_memory)
            .map(|(idx, _)| PathBuf::from(PATHS[*idx]))
            .collect();
        prop_assert_eq!(flushed, expected);

        for (idx, (content, in_memory)) in &last {
            let path = PathBuf::from(PATHS[*idx]);
            if *in_memory {
                prop_assert_eq!(sys.read_file(&path), None);
            } else {
                prop_assert_eq!(sys.read_file(&path), Some(content.clone()));
            }
            prop_assert_eq!(fs.read_file(&path), Some(content.clone()));
        }
    }

    /// PROPERTY: A second commit with no new writes flushes nothing.
    #[test]
    fn property_commit_is_idempotent(ops in proptest::collection::vec(write_op(), 1..24)) {
        let sys = Arc::new(MemorySystem::new());
        let fs = InMemoryFileSystem::new(sys.clone());
        for op in &ops {
            let opts = if op.in_memory { WriteOptions::in_memory() } else { WriteOptions::default() };
            fs.write_file(&PathBuf::from(PATHS[op.path]), &op.content, opts).unwrap();
        }

        fs.commit().unwrap();
        let files = sys.file_paths();

        prop_assert!(fs.commit().unwrap().is_empty());
        prop_assert!(fs.pending_writes().is_empty());
        prop_assert_eq!(sys.file_paths(), files);
    }
}
