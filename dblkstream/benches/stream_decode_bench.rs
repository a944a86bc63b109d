use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use zerocopy::IntoBytes;

use dblkio::prelude::*;
use dblkstream::prelude::*;
use dblkstream::record::device::{self, DeviceHeader, DeviceSync, seal_record};

criterion_group!(benches, stream_decode_bench);
criterion_main!(benches);

const STREAM_BYTES: usize = 4 * 1024 * 1024;

/// SYNC every 64 records, sensor records in between.
fn device_stream() -> Vec<u8> {
    let mut stream = Vec::with_capacity(STREAM_BYTES);
    let mut recnum = 1u32;
    while stream.len() < STREAM_BYTES {
        let mut rec = if recnum % 64 == 1 {
            DeviceSync::new(device::DT_SYNC, recnum, 0).as_bytes().to_vec()
        } else {
            let mut rec = DeviceHeader::new(68, device::DT_SENSOR_DATA, recnum)
                .as_bytes()
                .to_vec();
            rec.resize(68, 0xA5);
            rec
        };
        seal_record(&mut rec);
        stream.extend(&rec);
        recnum += 1;
    }
    pack_stream(&stream, 0)
}

pub fn stream_decode_bench(c: &mut Criterion) {
    let mut disk = device_stream();
    let sectors = (disk.len() / SECTOR_SIZE) as u32;
    let mut mem_io = MemDblkIO::new(&mut disk);

    let mut group = c.benchmark_group("dblkstream");
    group.throughput(Throughput::Bytes((sectors as usize * SECTOR_SIZE) as u64));

    group.bench_function("next_byte_clean_region", |b| {
        b.iter(|| {
            let mut reader = SectorStreamReader::new(&mut mem_io, DeviceFormat);
            let mut cursor = StreamCursor::new(0, sectors - 1);
            let mut n = 0usize;
            while reader.next_byte(&mut cursor).is_ok() {
                n += 1;
            }
            n
        });
    });

    group.bench_function("decode_device_records", |b| {
        b.iter(|| {
            let reader = SectorStreamReader::new(&mut mem_io, DeviceFormat);
            let codec = RecordCodec::new(reader, StreamCursor::new(0, sectors - 1));
            codec.filter(|r| r.is_ok()).count()
        });
    });

    group.finish();
}
