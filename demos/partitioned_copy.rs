//! Host-side emulation of a cooperative tiled copy: a 2x2 grid of blocks,
//! each with a 2x2 arrangement of threads, moves a column-major 8x8 matrix
//! into a row-major destination tile by tile.

use moyelib::array::OwnArray;
use moyelib::copy::copy;
use moyelib::env::{ExecEnv, HostEnv};
use moyelib::ituple;
use moyelib::layout::Layout;
use moyelib::tiling::{local_partition, local_partition_mut, local_tile, local_tile_mut, CoordIter};

use rand::Rng;

const N: usize = 64;

fn main() {
    env_logger::init();

    let mut data = [0f32; N];
    let mut rng = rand::rng();
    for x in data.iter_mut() {
        *x = rng.random_range(-1.0..1.0);
    }

    let src = OwnArray::new(data, Layout::from_shape(ituple![8, 8])).unwrap();
    let mut dst = OwnArray::<f32, N>::filled(0.0, Layout::row_major(ituple![8, 8])).unwrap();

    let thread_layout = Layout::from_shape(ituple![2, 2]);
    let threads = thread_layout.size().value();

    let mut blocks = 0;
    for block in CoordIter::new(ituple![2, 2]) {
        // serial stand-in for one cooperative block
        for tid in 0..threads {
            let env = HostEnv::thread_of(tid, threads);

            let src_tile = local_tile(&src, &ituple![4, 4], &block).unwrap();
            let mut dst_tile = local_tile_mut(&mut dst, &ituple![4, 4], &block).unwrap();

            let src_part = local_partition(&src_tile, &thread_layout, env.thread_id()).unwrap();
            let mut dst_part =
                local_partition_mut(&mut dst_tile, &thread_layout, env.thread_id()).unwrap();

            copy(&src_part, &mut dst_part);
            env.sync_threads();
        }
        blocks += 1;
    }

    for c in 0..(N as i64) {
        assert_eq!(src.get(c), dst.get(c), "element {} diverged", c);
    }
    println!(
        "copied 8x8 col-major -> row-major across {} blocks of {} threads",
        blocks, threads
    );
}
