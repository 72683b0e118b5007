use anyhow::Result;
use clap::Parser;
use hashbench::{run, Args};
use stats_alloc::{StatsAlloc, INSTRUMENTED_SYSTEM};
use std::alloc::System;

// Feeds the B/op and allocs/op columns
#[global_allocator]
static ALLOC: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

fn main() -> Result<()> {
    let args = Args::parse();
    run(args)
}
