#![no_main]
use std::cell::RefCell;

use arbitrary::Arbitrary;
use futures::executor::block_on;
use jsonrows::{
    Attributes, CommentHandling, JsonStreamReader, ReaderOptions, StreamingResult, TypeDecoder,
    ValueDecoder, chunk_utils::ChunkedReader,
};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::{Map, Value};

const HEADER: usize = 5; // 1 flag + 4-byte seed

thread_local! {
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

static WS_TABLE: &[&[u8]] = &[b" ", b"\t", b"\n", b"\r", b"\r\n", b"/* c */", b"// c\n"];

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8 & 0x1F);
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let limit = max_size - HEADER;
        let mut written = HEADER;
        written += append_whitespace(&mut data[written..], limit);
        written += append_response(&mut data[written..], size, max_size - written);
        written += append_whitespace(&mut data[written..], max_size - written);
        written
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

/// Appends up to eight whitespace or comment fragments without exceeding
/// `limit`. Returns the number of bytes written.
fn append_whitespace(buf: &mut [u8], limit: usize) -> usize {
    with_rng(|rng| {
        if limit == 0 {
            return 0;
        }
        let count = rng.random_range(1..=limit.min(8));
        let mut written = 0;
        for _ in 0..count {
            let w = WS_TABLE[rng.random_range(0..WS_TABLE.len())];
            if written + w.len() > limit {
                break;
            }
            buf[written..written + w.len()].copy_from_slice(w);
            written += w.len();
        }
        written
    })
}

/// Appends a row response built from arbitrary values, truncated to `limit`.
fn append_response(data: &mut [u8], size: usize, limit: usize) -> usize {
    let value = || loop {
        let s = with_rng(|rng| rng.random_range(size / 2..size * 2 + 1).min(limit));
        let bytes: Vec<u8> = with_rng(|rng| (0..s).map(|_| rng.random::<u8>()).collect());
        if let Ok(value) = ArbitraryValue::arbitrary(&mut arbitrary::Unstructured::new(&bytes)) {
            break value.0;
        }
    };
    let mut response = Map::new();
    response.insert("total_rows".to_owned(), value());
    response.insert("rows".to_owned(), value());
    response.insert("took_ms".to_owned(), value());

    let serialized =
        serde_json::to_vec(&Value::Object(response)).expect("arbitrary values serialize");
    let len = serialized.len().min(limit);
    data[..len].copy_from_slice(&serialized[..len]);
    len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

#[derive(Debug)]
struct ArbitraryValue(Value);

impl<'a> Arbitrary<'a> for ArbitraryValue {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let value = match u.choose_index(21)? {
            0 => Value::Null,
            1 => Value::Bool(u.arbitrary()?),
            2 => {
                let n: f64 = u.arbitrary()?;
                Value::Number(
                    serde_json::Number::from_f64(n).ok_or(arbitrary::Error::IncorrectFormat)?,
                )
            }
            3 => Value::from(u.arbitrary::<i64>()?),
            4..=10 => Value::String(u.arbitrary()?),
            11..=15 => {
                let elems: Vec<ArbitraryValue> = u.arbitrary()?;
                Value::Array(elems.into_iter().map(|v| v.0).collect())
            }
            _ => {
                let m: Vec<(String, ArbitraryValue)> = u.arbitrary()?;
                Value::Object(Map::from_iter(m.into_iter().map(|(k, v)| (k, v.0))))
            }
        };
        Ok(ArbitraryValue(value))
    }
}

/// Streams the document through a [`StreamingResult`], reading rows as
/// tokens. Errors are fine; panics and hangs are not.
fn read_rows<D: TypeDecoder>(reader: &mut JsonStreamReader<ChunkedReader, D>) {
    let mut result: StreamingResult<'_, _, _, _, Value> =
        StreamingResult::with_metadata(reader, Attributes::new("rows"));
    let _ = block_on(async {
        result.initialize().await?;
        let mut rows = result.rows()?;
        while rows.next().await?.is_some() {}
        Ok::<_, jsonrows::ResultError>(())
    });
}

/// Walks every property and reads every scalar after one.
fn walk_properties<D: TypeDecoder>(reader: &mut JsonStreamReader<ChunkedReader, D>) {
    let _ = block_on(async {
        reader.initialize().await?;
        while reader.read_to_next_property().await?.is_some() {
            if reader.current_value_kind().is_some() {
                reader.current_value()?;
                reader.read_token().await?;
            }
        }
        Ok::<_, jsonrows::Error>(())
    });
}

fn reader(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }

    let flags = data[0];
    let split_seed = u32::from_le_bytes(data[1..5].try_into().unwrap()) as usize;
    let data = &data[HEADER..];

    let options = ReaderOptions {
        buffer_size: 16 << (split_seed % 6),
        allow_trailing_commas: flags & 1 != 0,
        comment_handling: if flags & 2 != 0 {
            CommentHandling::Skip
        } else {
            CommentHandling::Disallow
        },
        max_depth: (split_seed >> 8) % 130,
    };
    let chunk_size = (split_seed >> 16) % 64 + 1;
    let source = ChunkedReader::new(data, chunk_size);

    match (flags >> 2) & 3 {
        0 => read_rows(&mut JsonStreamReader::new(source, options)),
        1 => read_rows(&mut JsonStreamReader::with_decoder(source, ValueDecoder, options)),
        _ => walk_properties(&mut JsonStreamReader::new(source, options)),
    }
}

fuzz_target!(|data: &[u8]| reader(data));
