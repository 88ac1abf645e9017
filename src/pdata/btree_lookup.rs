use anyhow::{anyhow, Result};

use crate::io_engine::*;
use crate::pdata::btree::*;
use crate::pdata::unpack::*;

//------------------------------------------

// Inefficient because we unpack entire nodes, but that's fine for
// occasional lookups such as a device's mapping root.
pub fn btree_lookup<V>(engine: &dyn IoEngine, root: u64, key: u64) -> Result<Option<V>>
where
    V: Unpack + Clone,
{
    let mut path = vec![root];
    let mut loc = root;
    let mut is_root = true;

    loop {
        let block = engine.read(loc).map_err(|_| io_err(&path))?;
        let node = check_and_unpack_node::<V>(&path, &block, true, is_root)?;
        match node {
            Node::Internal { keys, values, .. } => {
                // Select a child ...
                let idx = match keys.binary_search(&key) {
                    Ok(idx) => idx,
                    Err(0) => return Ok(None),
                    Err(idx) => idx - 1,
                };

                // ... and move to it.
                loc = values[idx];
                if path.contains(&loc) {
                    return Err(anyhow!("loop detected in btree at block {}", loc));
                }
                path.push(loc);
            }
            Node::Leaf { keys, values, .. } => {
                return Ok(keys
                    .binary_search(&key)
                    .ok()
                    .map(|idx| values[idx].clone()));
            }
        }

        is_root = false;
    }
}

//------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_engine::core::*;
    use crate::pdata::btree_builder::*;

    #[test]
    fn lookup_in_single_leaf() {
        let engine = CoreIoEngine::new(16);
        let mut w = NodeWriter::new(&engine, 1);
        let root = build_btree(&mut w, &[(1u64, 100u64), (5, 500), (9, 900)]).unwrap();

        assert_eq!(btree_lookup::<u64>(&engine, root, 5).unwrap(), Some(500));
        assert_eq!(btree_lookup::<u64>(&engine, root, 0).unwrap(), None);
        assert_eq!(btree_lookup::<u64>(&engine, root, 6).unwrap(), None);
    }

    #[test]
    fn lookup_in_multi_level_tree() {
        let engine = CoreIoEngine::new(64);
        let mut w = NodeWriter::new(&engine, 1);
        let entries: Vec<(u64, u64)> = (0..2000).map(|k| (k * 2, k)).collect();
        let root = build_btree(&mut w, &entries).unwrap();

        for k in [0u64, 2, 1022, 2500, 3998] {
            assert_eq!(btree_lookup::<u64>(&engine, root, k).unwrap(), Some(k / 2));
        }
        assert_eq!(btree_lookup::<u64>(&engine, root, 3).unwrap(), None);
        assert_eq!(btree_lookup::<u64>(&engine, root, 4000).unwrap(), None);
    }

    #[test]
    fn lookup_through_trashed_root_fails() {
        let engine = CoreIoEngine::new(16);
        let mut w = NodeWriter::new(&engine, 1);
        let root = build_btree(&mut w, &[(1u64, 100u64)]).unwrap();
        trash_block(&engine, root).unwrap();

        assert!(btree_lookup::<u64>(&engine, root, 1).is_err());
    }
}

//------------------------------------------
