//! End-to-end coverage of the freeze / view / unfreeze paths.

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    sync::Arc,
};

use bytes::Bytes;
use permafrost::{
    error::CodecError,
    frozen::{
        freeze,
        view::{BoundView, ClusteringKeyView, PartitionConsumer, RowView},
        FrozenMutation,
    },
    mutation::{
        Cell, CellTtl, ClusteringKey, Mutation, PartitionKey, RangeBound, RangeTombstone, Row,
        RowMarker, Tombstone,
    },
    schema::{ColumnMeta, DecoratedKey, Partitioner, Schema, SchemaVersion, TableId, Token},
};

fn test_schema() -> Arc<Schema> {
    Arc::new(Schema::new(
        TableId::new(),
        SchemaVersion::new(),
        [
            (1, ColumnMeta::statik("s")),
            (7, ColumnMeta::regular("v")),
            (8, ColumnMeta::regular("w")),
        ],
    ))
}

fn pk(name: &str) -> PartitionKey {
    PartitionKey::new([name.as_bytes().to_vec()])
}

fn ck(name: &str) -> ClusteringKey {
    ClusteringKey::new([name.as_bytes().to_vec()])
}

#[derive(Default)]
struct Events {
    tombstones: usize,
    static_rows: usize,
    rows: usize,
    range_tombstones: usize,
    order: Vec<&'static str>,
}

impl PartitionConsumer for Events {
    fn accept_partition_tombstone(&mut self, tombstone: Tombstone) {
        if !tombstone.is_none() {
            self.tombstones += 1;
            self.order.push("tombstone");
        }
    }

    fn accept_static_row(&mut self, _row: RowView<'_>) -> Result<(), CodecError> {
        self.static_rows += 1;
        self.order.push("static");
        Ok(())
    }

    fn accept_row(
        &mut self,
        _key: ClusteringKeyView<'_>,
        _row: RowView<'_>,
    ) -> Result<(), CodecError> {
        self.rows += 1;
        self.order.push("row");
        Ok(())
    }

    fn accept_range_tombstone(
        &mut self,
        _start: BoundView<'_>,
        _end: BoundView<'_>,
        _tombstone: Tombstone,
    ) -> Result<(), CodecError> {
        self.range_tombstones += 1;
        self.order.push("range");
        Ok(())
    }
}

#[test]
fn empty_partition_round_trips() {
    let schema = test_schema();
    let m = Mutation::new(pk("pk1"), Arc::clone(&schema));

    let frozen = freeze(&m);
    assert_eq!(frozen.unfreeze(Arc::clone(&schema)).unwrap(), m);

    // Byte determinism: freezing again yields the same buffer.
    assert_eq!(freeze(&m).bytes(), frozen.bytes());
    assert!(m.partition().is_empty());
}

#[test]
fn single_live_cell_round_trips() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    m.partition_mut()
        .row_mut(ck("c1"))
        .set_cell(7, Cell::live(100, &b"v"[..]));

    let frozen = freeze(&m);
    let thawed = frozen.unfreeze(Arc::clone(&schema)).unwrap();
    assert_eq!(thawed, m);

    let row = &thawed.partition().rows()[&ck("c1")];
    assert_eq!(
        row.cells[&7],
        Cell::Live {
            timestamp: 100,
            ttl: None,
            value: Bytes::from_static(b"v"),
        }
    );

    // The view yields exactly one clustering-row callback.
    let mut events = Events::default();
    frozen.partition().unwrap().accept(&mut events).unwrap();
    assert_eq!(events.rows, 1);
    assert_eq!(events.tombstones, 0);
    assert_eq!(events.static_rows, 0);
}

#[test]
fn partition_tombstone_does_not_suppress_rows() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    m.partition_mut().apply_tombstone(Tombstone::new(50, 1000));
    m.partition_mut()
        .row_mut(ck("c1"))
        .set_cell(7, Cell::live(40, &b"old"[..]));

    let thawed = freeze(&m).unfreeze(Arc::clone(&schema)).unwrap();
    // Reconciliation is a downstream concern; the codec preserves both.
    assert_eq!(thawed.partition().tombstone(), Tombstone::new(50, 1000));
    assert_eq!(thawed.partition().rows().len(), 1);
    assert_eq!(thawed, m);
}

#[test]
fn range_tombstone_precedes_rows_and_survives() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    m.partition_mut().apply_range_tombstone(RangeTombstone {
        start: RangeBound::inc_start(ck("c1")),
        end: RangeBound::exc_end(ck("c3")),
        tombstone: Tombstone::new(200, 200),
    });
    for name in ["c1", "c2", "c4"] {
        m.partition_mut()
            .row_mut(ck(name))
            .set_cell(7, Cell::live(10, &b"x"[..]));
    }

    let frozen = freeze(&m);
    let mut events = Events::default();
    frozen.partition().unwrap().accept(&mut events).unwrap();
    assert_eq!(events.order, vec!["range", "row", "row", "row"]);

    let thawed = frozen.unfreeze(Arc::clone(&schema)).unwrap();
    assert_eq!(thawed.partition().rows().len(), 3);
    assert_eq!(thawed.partition().range_tombstones().len(), 1);
    assert_eq!(thawed, m);
}

#[test]
fn static_row_and_markers_round_trip() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));

    let mut static_row = Row::new();
    static_row.set_cell(1, Cell::live(5, &b"static"[..]));
    m.partition_mut().set_static_row(static_row);

    let row = m.partition_mut().row_mut(ck("c1"));
    row.marker = RowMarker::Live {
        timestamp: 7,
        ttl: Some(CellTtl {
            ttl_secs: 60,
            expiry: 67,
        }),
    };
    row.tombstone = Tombstone::new(3, 4);
    row.set_cell(
        7,
        Cell::live_with_ttl(
            9,
            CellTtl {
                ttl_secs: 1,
                expiry: 10,
            },
            &b"ttl'd"[..],
        ),
    );
    row.set_cell(8, Cell::dead(11, 12));

    let frozen = freeze(&m);
    assert_eq!(frozen.unfreeze(Arc::clone(&schema)).unwrap(), m);

    let mut events = Events::default();
    frozen.partition().unwrap().accept(&mut events).unwrap();
    assert_eq!(events.order, vec!["static", "row"]);
}

#[test]
fn collection_cells_round_trip() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    m.partition_mut().row_mut(ck("c1")).set_cell(
        7,
        Cell::Collection {
            tombstone: Tombstone::new(10, 20),
            elements: [
                (Bytes::from_static(b"e1"), Cell::live(30, &b"a"[..])),
                (Bytes::from_static(b"e2"), Cell::dead(40, 50)),
            ]
            .into_iter()
            .collect(),
        },
    );

    assert_eq!(freeze(&m).unfreeze(Arc::clone(&schema)).unwrap(), m);
}

#[test]
fn declared_length_beyond_buffer_is_truncated() {
    // Outer frame claims 1 MiB, only 32 bytes present.
    let mut buf = Vec::new();
    buf.extend_from_slice(&(1u32 << 20).to_le_bytes());
    buf.extend_from_slice(&[0u8; 32]);

    match FrozenMutation::from_bytes(Bytes::from(buf.clone())) {
        Err(CodecError::Truncated { needed, remaining }) => {
            assert_eq!(needed, 1 << 20);
            assert_eq!(remaining, 32);
        }
        other => panic!("expected truncated, got {other:?}"),
    }

    let adopted = FrozenMutation::from_wire(Bytes::from(buf), pk("pk1"));
    assert!(matches!(
        adopted.unfreeze(test_schema()),
        Err(CodecError::Truncated { .. })
    ));
}

#[test]
fn lying_cell_count_surfaces_truncated() {
    let schema = test_schema();

    // Hand-built envelope whose single row claims u32::MAX cells over a
    // near-empty buffer.
    let mut body = Vec::new();
    body.extend_from_slice(&schema.id().to_bytes());
    body.extend_from_slice(&schema.version().to_bytes());
    body.extend_from_slice(&7u32.to_le_bytes()); // key composite body len
    body.extend_from_slice(&3u32.to_le_bytes());
    body.extend_from_slice(b"pk1");

    let mut frame = Vec::new();
    frame.extend_from_slice(&[0xff; 16]); // no partition tombstone
    frame.push(0); // no static row
    frame.extend_from_slice(&0u32.to_le_bytes()); // no range tombstones
    frame.extend_from_slice(&1u32.to_le_bytes()); // one row
    frame.extend_from_slice(&0u32.to_le_bytes()); // empty clustering key
    frame.push(0); // no marker
    frame.extend_from_slice(&[0xff; 16]); // no row tombstone
    frame.extend_from_slice(&u32::MAX.to_le_bytes()); // cell count
    body.extend_from_slice(&(frame.len() as u32).to_le_bytes());
    body.extend_from_slice(&frame);

    let mut buf = Vec::new();
    buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
    buf.extend_from_slice(&body);

    let frozen = FrozenMutation::from_bytes(Bytes::from(buf)).unwrap();
    assert!(matches!(
        frozen.unfreeze(Arc::clone(&schema)),
        Err(CodecError::Truncated { .. })
    ));
}

#[test]
fn every_strict_prefix_fails_truncated() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    m.partition_mut().apply_tombstone(Tombstone::new(50, 1000));
    m.partition_mut()
        .row_mut(ck("c1"))
        .set_cell(7, Cell::live(100, &b"value"[..]));
    m.partition_mut().apply_range_tombstone(RangeTombstone {
        start: RangeBound::inc_start(ck("c1")),
        end: RangeBound::inc_end(ck("c2")),
        tombstone: Tombstone::new(1, 2),
    });

    let frozen = freeze(&m);
    let bytes = frozen.bytes();
    for cut in 0..bytes.len() {
        let prefix = bytes.slice(..cut);
        let adopted = FrozenMutation::from_wire(prefix, pk("pk1"));
        match adopted.unfreeze(Arc::clone(&schema)) {
            Err(CodecError::Truncated { .. }) => {}
            other => panic!("prefix of {cut} bytes: expected truncated, got {other:?}"),
        }
    }
}

#[test]
fn unknown_tail_inside_frames_is_skipped() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    m.partition_mut()
        .row_mut(ck("c1"))
        .set_cell(7, Cell::live(100, &b"v"[..]));

    let frozen = freeze(&m);
    let bytes = frozen.bytes();

    // Locate the partition frame length field: outer prefix (4) + ids (32) +
    // partition key blob (4 + body).
    let pk_len =
        u32::from_le_bytes(bytes[36..40].try_into().unwrap()) as usize;
    let frame_len_at = 40 + pk_len;

    let junk = b"fields from a future version";
    let mut extended = bytes.to_vec();
    extended.extend_from_slice(junk);

    let patch = |buf: &mut [u8], at: usize, delta: usize| {
        let old = u32::from_le_bytes(buf[at..at + 4].try_into().unwrap());
        buf[at..at + 4].copy_from_slice(&(old + delta as u32).to_le_bytes());
    };
    patch(&mut extended, 0, junk.len());
    patch(&mut extended, frame_len_at, junk.len());

    let widened = FrozenMutation::from_bytes(Bytes::from(extended)).unwrap();
    assert_eq!(widened.table_id().unwrap(), frozen.table_id().unwrap());
    assert_eq!(
        widened.schema_version().unwrap(),
        frozen.schema_version().unwrap()
    );
    assert_eq!(widened.key(), frozen.key());
    assert_eq!(widened.unfreeze(Arc::clone(&schema)).unwrap(), m);
}

#[test]
fn accessors_agree_with_unfreeze() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("routing-key"), Arc::clone(&schema));
    m.partition_mut()
        .row_mut(ck("c1"))
        .set_cell(8, Cell::live(3, &b"w"[..]));

    let frozen = freeze(&m);
    assert_eq!(frozen.table_id().unwrap(), schema.id());
    assert_eq!(frozen.schema_version().unwrap(), schema.version());
    assert_eq!(frozen.key(), m.key());

    let reparsed = FrozenMutation::from_bytes(frozen.bytes().clone()).unwrap();
    assert_eq!(reparsed.key(), m.key());
    assert_eq!(reparsed, frozen);

    let thawed = frozen.unfreeze(Arc::clone(&schema)).unwrap();
    assert_eq!(thawed.schema().id(), frozen.table_id().unwrap());
    assert_eq!(thawed.key(), frozen.key());
}

#[test]
fn wrong_schema_version_is_reported() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    m.partition_mut()
        .row_mut(ck("c1"))
        .set_cell(7, Cell::live(1, &b"v"[..]));
    let frozen = freeze(&m);

    let other = Arc::new(Schema::new(
        schema.id(),
        SchemaVersion::new(),
        [(7, ColumnMeta::regular("v"))],
    ));
    assert_eq!(
        frozen.unfreeze(other),
        Err(CodecError::SchemaVersionMissing {
            version: schema.version()
        })
    );
}

#[test]
fn unknown_column_id_is_a_schema_mismatch() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    m.partition_mut()
        .row_mut(ck("c1"))
        .set_cell(7, Cell::live(1, &b"v"[..]));
    let frozen = freeze(&m);

    // Same version, column 7 dropped: version check passes, column fails.
    let narrowed = Arc::new(Schema::new(
        schema.id(),
        schema.version(),
        [(1, ColumnMeta::statik("s"))],
    ));
    assert_eq!(
        frozen.unfreeze(narrowed),
        Err(CodecError::SchemaMismatch { column_id: 7 })
    );
}

struct HashPartitioner;

impl Partitioner for HashPartitioner {
    fn decorate_key(&self, _schema: &Schema, key: &PartitionKey) -> DecoratedKey {
        let mut hasher = DefaultHasher::new();
        key.components().hash(&mut hasher);
        DecoratedKey {
            token: Token(hasher.finish()),
            key: key.clone(),
        }
    }
}

#[test]
fn decorated_key_delegates_to_the_partitioner() {
    let schema = test_schema();
    let m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    let frozen = freeze(&m);

    let from_live = m.decorated_key(&HashPartitioner);
    let from_frozen = frozen.decorated_key(&schema, &HashPartitioner);
    assert_eq!(from_live, from_frozen);
    assert_eq!(from_frozen.key, pk("pk1"));
}

#[test]
fn pretty_printer_thaws_and_renders() {
    let schema = test_schema();
    let mut m = Mutation::new(pk("pk1"), Arc::clone(&schema));
    m.partition_mut()
        .row_mut(ck("c1"))
        .set_cell(7, Cell::live(100, &b"hello"[..]));

    let frozen = freeze(&m);
    let rendered = frozen.pretty(Arc::clone(&schema)).to_string();
    assert!(rendered.contains("row"), "got: {rendered}");
    assert!(rendered.contains("v="), "got: {rendered}");

    let unresolvable = Arc::new(Schema::new(
        schema.id(),
        SchemaVersion::new(),
        std::iter::empty::<(u32, ColumnMeta)>(),
    ));
    let rendered = frozen.pretty(unresolvable).to_string();
    assert!(rendered.contains("unprintable"), "got: {rendered}");
}

fn random_mutation(rng: &mut fastrand::Rng, schema: &Arc<Schema>) -> Mutation {
    let mut m = Mutation::new(
        PartitionKey::new([format!("pk{}", rng.u32(..)).into_bytes()]),
        Arc::clone(schema),
    );

    if rng.bool() {
        m.partition_mut()
            .apply_tombstone(Tombstone::new(rng.u64(..1 << 40), rng.u64(..1 << 40)));
    }
    if rng.bool() {
        let mut static_row = Row::new();
        static_row.set_cell(1, Cell::live(rng.u64(..1 << 40), rng.u8(..).to_le_bytes().to_vec()));
        m.partition_mut().set_static_row(static_row);
    }
    for _ in 0..rng.usize(..3) {
        let a = rng.u16(..1000);
        let b = a as u32 + 1 + rng.u32(..1000);
        m.partition_mut().apply_range_tombstone(RangeTombstone {
            start: RangeBound::inc_start(ck(&format!("c{a:06}"))),
            end: RangeBound::exc_end(ck(&format!("c{b:06}"))),
            tombstone: Tombstone::new(rng.u64(..1 << 40), rng.u64(..1 << 40)),
        });
    }
    for _ in 0..rng.usize(..6) {
        let key = ck(&format!("c{:06}", rng.u32(..1_000_000)));
        let row = m.partition_mut().row_mut(key);
        for column in [7u32, 8] {
            match rng.u8(..3) {
                0 => {
                    row.set_cell(
                        column,
                        Cell::live(rng.u64(..1 << 40), vec![rng.u8(..); rng.usize(..16)]),
                    );
                }
                1 => {
                    row.set_cell(column, Cell::dead(rng.u64(..1 << 40), rng.u64(..1 << 40)));
                }
                _ => {}
            }
        }
    }
    m
}

#[test]
fn randomized_round_trips_are_stable() {
    let schema = test_schema();
    let mut rng = fastrand::Rng::with_seed(42);

    for _ in 0..100 {
        let m = random_mutation(&mut rng, &schema);
        let frozen = freeze(&m);
        assert_eq!(frozen.unfreeze(Arc::clone(&schema)).unwrap(), m);
        // Determinism: refreezing the thawed mutation reproduces the bytes.
        let refrozen = freeze(&frozen.unfreeze(Arc::clone(&schema)).unwrap());
        assert_eq!(refrozen.bytes(), frozen.bytes());
        assert_eq!(refrozen, frozen);
    }
}
