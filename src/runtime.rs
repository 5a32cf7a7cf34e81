//! Background scan thread and the snapshot handoff between it and a
//! render-rate consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};
use parking_lot::Mutex;

use crate::entity::{Entity, EntityReconstructor, Rarity};
use crate::names::NameResolver;
use crate::world::types::CameraPose;
use crate::world::WorldReader;

/// Floor on the inter-pass sleep, so a slow pass cannot starve the target
/// process of cheap reads back to back.
const MIN_SLEEP: Duration = Duration::from_millis(50);

/// One completed reconstruction pass.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub entities: Vec<Entity>,
    pub camera: Option<CameraPose>,
    pub pass: u64,
}

/// Single-slot mailbox between the scan thread and its consumer. The scan
/// thread overwrites the slot each pass; the consumer takes it at most once
/// per publish.
pub struct SnapshotBus {
    latest: Mutex<Snapshot>,
    fresh: AtomicBool,
    running: AtomicBool,
}

impl SnapshotBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            latest: Mutex::new(Snapshot::default()),
            fresh: AtomicBool::new(false),
            running: AtomicBool::new(true),
        })
    }

    pub fn publish(&self, snapshot: Snapshot) {
        *self.latest.lock() = snapshot;
        self.fresh.store(true, Ordering::Release);
    }

    /// The latest snapshot, if one was published since the last take.
    pub fn take_if_fresh(&self) -> Option<Snapshot> {
        if !self.fresh.swap(false, Ordering::Acquire) {
            return None;
        }
        Some(std::mem::take(&mut *self.latest.lock()))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Owns the scan thread for its lifetime.
pub struct ScanTask {
    handle: JoinHandle<()>,
    bus: Arc<SnapshotBus>,
}

impl ScanTask {
    pub fn spawn(
        mut world: WorldReader,
        names: NameResolver,
        mut reconstructor: EntityReconstructor,
        bus: Arc<SnapshotBus>,
        interval: Duration,
        min_rarity: Rarity,
    ) -> std::io::Result<Self> {
        let thread_bus = Arc::clone(&bus);
        let handle = thread::Builder::new()
            .name("dw-scan".to_string())
            .spawn(move || {
                info!("scan thread started, interval {:?}", interval);
                let mut pass: u64 = 0;
                while thread_bus.is_running() {
                    let started = Instant::now();
                    pass += 1;

                    reconstructor.update(&mut world, &names, min_rarity);
                    let camera = world.camera_pose_fast();

                    thread_bus.publish(Snapshot {
                        entities: reconstructor.entities().to_vec(),
                        camera,
                        pass,
                    });

                    let elapsed = started.elapsed();
                    if elapsed > interval {
                        debug!("pass {} overran the interval: {:?}", pass, elapsed);
                    }
                    thread::sleep(interval.saturating_sub(elapsed).max(MIN_SLEEP));
                }
                info!("scan thread stopped after {} passes", pass);
            })?;
        Ok(Self { handle, bus })
    }

    /// Signals the thread to stop and waits for it.
    pub fn shutdown(self) {
        self.bus.shutdown();
        let _ = self.handle.join();
    }
}
