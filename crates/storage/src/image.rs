// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table contents rebuilt from the write-ahead log

use crate::table::{ConnectionRow, IndexDescription};
use crate::wal::{RowWrite, TableOp};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableImage {
    pub installed: bool,
    pub rows: BTreeMap<String, ConnectionRow>,
    pub indexes: BTreeMap<String, IndexDescription>,
}

impl TableImage {
    pub fn replay<'a>(ops: impl IntoIterator<Item = &'a TableOp>) -> Self {
        let mut image = Self::default();
        for op in ops {
            image.apply(op);
        }
        image
    }

    pub fn apply(&mut self, op: &TableOp) {
        match op {
            TableOp::CreateTable => {
                self.installed = true;
            }

            TableOp::DropTable => {
                *self = Self::default();
            }

            TableOp::AddIndex { index } => {
                self.indexes.insert(index.name.clone(), index.clone());
            }

            TableOp::DropIndex { name } => {
                self.indexes.remove(name);
            }

            TableOp::Commit { writes } => {
                for write in writes {
                    match write {
                        RowWrite::Put { row } => {
                            self.rows.insert(row.name.clone(), row.clone());
                        }
                        RowWrite::Delete { name } => {
                            self.rows.remove(name);
                        }
                    }
                }
            }
        }
    }
}
