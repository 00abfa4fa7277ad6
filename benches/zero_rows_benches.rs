use std::io::{Cursor, Read, Write};

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use zero_rows::sync::{Conn, WireTransport};
use zero_rows::{Opts, ScanTarget, Value};

pub struct User {
    pub id: i32,
    pub name: String,
    pub hair_color: Option<String>,
}

struct Replay {
    input: Cursor<Vec<u8>>,
}

impl Read for Replay {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for Replay {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn message(out: &mut Vec<u8>, tag: u8, body: &[u8]) {
    out.push(tag);
    out.extend_from_slice(&(body.len() as i32 + 4).to_be_bytes());
    out.extend_from_slice(body);
}

/// Server bytes for `SELECT id, name, hair_color FROM users` returning `size` rows
fn users_response(size: usize) -> Vec<u8> {
    let mut out = Vec::new();

    let mut body = 3_i16.to_be_bytes().to_vec();
    for (name, oid) in [("id", 23_u32), ("name", 25), ("hair_color", 25)] {
        body.extend_from_slice(name.as_bytes());
        body.push(0);
        body.extend_from_slice(&[0; 6]);
        body.extend_from_slice(&oid.to_be_bytes());
        body.extend_from_slice(&(-1_i16).to_be_bytes());
        body.extend_from_slice(&(-1_i32).to_be_bytes());
        body.extend_from_slice(&0_i16.to_be_bytes());
    }
    message(&mut out, b'T', &body);

    for i in 0..size {
        let id = i.to_string();
        let name = format!("User {}", i);
        let mut body = 3_i16.to_be_bytes().to_vec();
        for value in [id.as_bytes(), name.as_bytes()] {
            body.extend_from_slice(&(value.len() as i32).to_be_bytes());
            body.extend_from_slice(value);
        }
        if i % 2 == 0 {
            body.extend_from_slice(&5_i32.to_be_bytes());
            body.extend_from_slice(b"black");
        } else {
            body.extend_from_slice(&(-1_i32).to_be_bytes());
        }
        message(&mut out, b'D', &body);
    }

    message(&mut out, b'C', format!("SELECT {}\0", size).as_bytes());
    message(&mut out, b'Z', b"I");
    out
}

fn connection(response: &[u8]) -> Conn<WireTransport<Replay>> {
    let stream = Replay {
        input: Cursor::new(response.to_vec()),
    };
    let mut opts = Opts::default();
    opts.log_level = log::LevelFilter::Off;
    Conn::new_with_transport(WireTransport::new(stream), opts)
}

const SQL: &str = "SELECT id, name, hair_color FROM users";

fn bench_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("values");
    for size in [1, 100, 1000].iter() {
        let response = users_response(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || connection(&response),
                |mut conn| {
                    let mut rows = conn.query(SQL, &[]).unwrap();
                    let mut out: Vec<Vec<Value>> = Vec::with_capacity(size);
                    while rows.next_row() {
                        out.push(rows.values().unwrap());
                    }
                    out
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    for size in [1, 100, 1000].iter() {
        let response = users_response(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || connection(&response),
                |mut conn| {
                    let mut rows = conn.query(SQL, &[]).unwrap();
                    let mut users = Vec::with_capacity(size);
                    while rows.next_row() {
                        let mut user = User {
                            id: 0,
                            name: String::new(),
                            hair_color: None,
                        };
                        rows.scan(&mut [
                            Some(&mut user.id as &mut dyn ScanTarget),
                            Some(&mut user.name as &mut dyn ScanTarget),
                            Some(&mut user.hair_color as &mut dyn ScanTarget),
                        ])
                        .unwrap();
                        users.push(user);
                    }
                    users
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_read_tuple(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_tuple");
    for size in [1, 100, 1000].iter() {
        let response = users_response(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || connection(&response),
                |mut conn| {
                    let mut rows = conn.query(SQL, &[]).unwrap();
                    let mut users = Vec::with_capacity(size);
                    while rows.next_row() {
                        let (id, name, hair_color) =
                            rows.read::<(i32, String, Option<String>)>().unwrap();
                        users.push(User {
                            id,
                            name,
                            hair_color,
                        });
                    }
                    users
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_values, bench_scan, bench_read_tuple);
criterion_main!(benches);
