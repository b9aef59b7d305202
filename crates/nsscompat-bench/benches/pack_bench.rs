//! Buffer packer throughput.
//!
//! Measures flattening of a typical passwd record and of group member
//! tables of increasing size into a 2 KiB region.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nsscompat_core::arena::ScratchArena;
use nsscompat_core::record::{GroupFields, UserFields, copy_group, copy_user};
use nsscompat_core::{ElementSize, pack_array, pack_string};

const BASE: usize = 0x7f00_0000_0000;

fn bench_pack_string(c: &mut Criterion) {
    let mut region = vec![0u8; 2048];
    c.bench_function("pack_string_shell", |b| {
        b.iter(|| {
            criterion::black_box(pack_string(
                criterion::black_box(Some(b"/usr/bin/zsh".as_slice())),
                &mut region,
            ))
        });
    });
}

fn bench_copy_user(c: &mut Criterion) {
    let mut region = vec![0u8; 2048];
    let fields = UserFields {
        name: Some(b"builder".as_slice()),
        passwd: Some(b"x".as_slice()),
        dir: Some(b"/home/builder".as_slice()),
        shell: Some(b"/bin/bash".as_slice()),
    };
    c.bench_function("copy_user", |b| {
        b.iter(|| {
            let mut arena = ScratchArena::new(&mut region, BASE);
            criterion::black_box(copy_user(&fields, &mut arena))
        });
    });
}

fn bench_group_members(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_group_members");
    for count in [4usize, 32, 128] {
        let owned: Vec<String> = (0..count).map(|i| format!("member{i:03}")).collect();
        let members: Vec<&[u8]> = owned.iter().map(|m| m.as_bytes()).collect();
        let mut region = vec![0u8; 4096];
        group.bench_with_input(BenchmarkId::from_parameter(count), &members, |b, members| {
            b.iter(|| {
                let fields = GroupFields {
                    name: Some(b"staff".as_slice()),
                    passwd: Some(b"x".as_slice()),
                    members: Some(members.as_slice()),
                };
                let mut arena = ScratchArena::new(&mut region, BASE);
                criterion::black_box(copy_group(&fields, &mut arena))
            });
        });
    }
    group.finish();
}

fn bench_pack_addresses(c: &mut Criterion) {
    let addrs: Vec<[u8; 16]> = (0..8u8).map(|i| [i; 16]).collect();
    let mut region = vec![0u8; 2048];
    c.bench_function("pack_array_ipv6_x8", |b| {
        b.iter(|| {
            criterion::black_box(pack_array(
                Some(addrs.as_slice()),
                ElementSize::Fixed(16),
                &mut region,
                BASE,
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_pack_string,
    bench_copy_user,
    bench_group_members,
    bench_pack_addresses
);
criterion_main!(benches);
