use crate::memory::{RemoteAddress, RemoteRead};
use crate::world::layout::LayoutResolver;
use crate::world::offsets;
use crate::world::types::{CameraPose, TArrayRaw};
use log::{debug, warn};
use std::sync::Arc;

const MAX_LEVELS: i32 = 1_000;
const MAX_ACTORS: i32 = 100_000;
/// Fast camera reads revalidate the cached manager pointer this often.
const CAMERA_CACHE_LIFETIME: u32 = 300;

/// Walks the world object graph: levels, actor lists, the local player
/// chain, and the camera.
pub struct WorldReader {
    reader: Arc<dyn RemoteRead>,
    gworld: RemoteAddress,
    layout: LayoutResolver,
    cached_camera_manager: RemoteAddress,
    camera_cache_age: u32,
}

impl WorldReader {
    pub fn new(reader: Arc<dyn RemoteRead>, gworld: RemoteAddress, layout: LayoutResolver) -> Self {
        Self {
            reader,
            gworld,
            layout,
            cached_camera_manager: RemoteAddress::zero(),
            camera_cache_age: 0,
        }
    }

    pub fn initialize(&self) -> bool {
        match self.world() {
            Some(world) => {
                debug!("world object at {}", world);
                true
            }
            None => {
                warn!("world pointer is null at {}", self.gworld);
                false
            }
        }
    }

    pub fn world(&self) -> Option<RemoteAddress> {
        let world = self.reader.read_ptr(self.gworld).ok()?;
        world.is_plausible().then_some(world)
    }

    /// Every actor pointer across all loaded levels, nulls removed, level
    /// order preserved. Falls back to the persistent level when the levels
    /// array is implausible; an unreadable world yields an empty list.
    pub fn all_actors(&mut self) -> Vec<RemoteAddress> {
        let mut actors = Vec::new();
        let world = match self.world() {
            Some(w) => w,
            None => return actors,
        };

        let levels = TArrayRaw::read_from(self.reader.as_ref(), world + offsets::world::LEVELS)
            .unwrap_or_default();

        if levels.is_plausible(MAX_LEVELS) {
            let level_ptrs = match levels.read_ptr_elements(self.reader.as_ref()) {
                Ok(p) => p,
                Err(_) => return actors,
            };

            if let Some(&first_live) = level_ptrs.iter().find(|p| p.is_plausible()) {
                self.layout.ensure_level_actors(self.reader.as_ref(), first_live);
            }
            let actors_offset = self.layout.level_actors_offset();

            for level in level_ptrs {
                if !level.is_plausible() {
                    continue;
                }
                self.collect_level_actors(level, actors_offset, &mut actors);
            }
        } else {
            // Persistent level fallback
            let level = self
                .reader
                .read_ptr(world + offsets::world::PERSISTENT_LEVEL)
                .unwrap_or_default();
            if level.is_plausible() {
                let actors_offset = self.layout.ensure_level_actors(self.reader.as_ref(), level);
                self.collect_level_actors(level, actors_offset, &mut actors);
            }
        }

        actors.retain(|a| !a.is_null());
        actors
    }

    fn collect_level_actors(
        &self,
        level: RemoteAddress,
        actors_offset: u64,
        out: &mut Vec<RemoteAddress>,
    ) {
        let array = match TArrayRaw::read_from(self.reader.as_ref(), level + actors_offset) {
            Ok(a) => a,
            Err(_) => return,
        };
        if array.count <= 0 || array.count > MAX_ACTORS || !array.data.is_plausible() {
            return;
        }
        if let Ok(ptrs) = array.read_ptr_elements(self.reader.as_ref()) {
            out.extend(ptrs);
        }
    }

    pub fn local_controller(&self) -> Option<RemoteAddress> {
        let world = self.world()?;
        let game_instance = self
            .reader
            .read_ptr(world + offsets::world::OWNING_GAME_INSTANCE)
            .ok()?;
        if !game_instance.is_plausible() {
            return None;
        }
        let local_players = TArrayRaw::read_from(
            self.reader.as_ref(),
            game_instance + offsets::game_instance::LOCAL_PLAYERS,
        )
        .ok()?;
        if local_players.count <= 0 || !local_players.data.is_plausible() {
            return None;
        }
        let local_player = self.reader.read_ptr(local_players.data).ok()?;
        if !local_player.is_plausible() {
            return None;
        }
        let controller = self
            .reader
            .read_ptr(local_player + offsets::local_player::PLAYER_CONTROLLER)
            .ok()?;
        controller.is_plausible().then_some(controller)
    }

    /// The pawn the local player currently controls.
    pub fn local_pawn(&self) -> Option<RemoteAddress> {
        let controller = self.local_controller()?;
        let pawn = self
            .reader
            .read_ptr(controller + offsets::player_controller::ACKNOWLEDGED_PAWN)
            .ok()?;
        pawn.is_plausible().then_some(pawn)
    }

    /// Full camera chain; refreshes the cached camera manager.
    pub fn camera_pose(&mut self) -> Option<CameraPose> {
        let controller = self.local_controller()?;
        let manager = self
            .reader
            .read_ptr(controller + offsets::player_controller::CAMERA_MANAGER)
            .ok()?;
        if !manager.is_plausible() {
            return None;
        }
        self.cached_camera_manager = manager;
        self.camera_cache_age = 0;
        self.read_pov(manager)
    }

    /// One read through the cached camera manager instead of the full chain.
    /// The cache is revalidated periodically and whenever the field of view
    /// stops looking like one.
    pub fn camera_pose_fast(&mut self) -> Option<CameraPose> {
        self.camera_cache_age += 1;
        if self.cached_camera_manager.is_null() || self.camera_cache_age > CAMERA_CACHE_LIFETIME {
            return self.camera_pose();
        }
        match self.read_pov(self.cached_camera_manager) {
            Some(pose) if pose.fov_is_sane() => Some(pose),
            _ => {
                self.cached_camera_manager = RemoteAddress::zero();
                self.camera_pose()
            }
        }
    }

    fn read_pov(&self, manager: RemoteAddress) -> Option<CameraPose> {
        let pov = manager
            + offsets::camera_manager::CAMERA_CACHE_PRIVATE
            + offsets::camera_manager::CACHE_POV;
        CameraPose::read_from(self.reader.as_ref(), pov).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::MockMemory;

    const GWORLD: u64 = 0x10_0000;
    const WORLD: u64 = 0x100_0000;
    const VTABLE: u64 = 0x7F00_0000;

    fn seed_world(mem: &MockMemory) {
        mem.write_u64(GWORLD, WORLD);
    }

    fn seed_actor(mem: &MockMemory, at: u64) {
        mem.write_u64(at, VTABLE);
        mem.write_u64(VTABLE, 1);
    }

    fn seed_level(mem: &MockMemory, level: u64, actor_data: u64, actors: &[u64]) {
        mem.write_tarray(level + offsets::level::ACTORS, actor_data, actors.len() as i32, actors.len() as i32);
        for (i, &a) in actors.iter().enumerate() {
            mem.write_u64(actor_data + i as u64 * 8, a);
            if a != 0 {
                seed_actor(mem, a);
            }
        }
    }

    fn reader(mem: Arc<MockMemory>) -> WorldReader {
        WorldReader::new(mem, RemoteAddress::new(GWORLD), LayoutResolver::new())
    }

    #[test]
    fn enumeration_filters_nulls_and_preserves_order() {
        let mem = Arc::new(MockMemory::new());
        seed_world(&mem);
        let level = 0x200_0000u64;
        mem.write_tarray(WORLD + offsets::world::LEVELS, 0x300_0000, 1, 1);
        mem.write_u64(0x300_0000, level);
        // 6 slots, 2 null
        let actors = [0x400_0000u64, 0, 0x400_2000, 0x400_3000, 0, 0x400_5000];
        seed_level(&mem, level, 0x310_0000, &actors);

        let mut wr = reader(mem);
        let got = wr.all_actors();
        assert_eq!(got.len(), 4);
        assert_eq!(got[0].as_u64(), 0x400_0000);
        assert_eq!(got[3].as_u64(), 0x400_5000);
    }

    #[test]
    fn implausible_levels_array_falls_back_to_persistent_level() {
        let mem = Arc::new(MockMemory::new());
        seed_world(&mem);
        mem.write_tarray(WORLD + offsets::world::LEVELS, 0, 0, 0);
        let level = 0x210_0000u64;
        mem.write_u64(WORLD + offsets::world::PERSISTENT_LEVEL, level);
        seed_level(&mem, level, 0x320_0000, &[0x410_0000, 0x410_1000]);

        let mut wr = reader(mem);
        assert_eq!(wr.all_actors().len(), 2);
    }

    #[test]
    fn unreadable_world_is_empty_not_fatal() {
        let mem = Arc::new(MockMemory::new());
        let mut wr = reader(mem);
        assert!(wr.all_actors().is_empty());
        assert!(wr.local_pawn().is_none());
    }

    #[test]
    fn local_player_chain() {
        let mem = Arc::new(MockMemory::new());
        seed_world(&mem);
        let gi = 0x500_0000u64;
        let lp = 0x510_0000u64;
        let pc = 0x520_0000u64;
        let pawn = 0x530_0000u64;
        mem.write_u64(WORLD + offsets::world::OWNING_GAME_INSTANCE, gi);
        mem.write_tarray(gi + offsets::game_instance::LOCAL_PLAYERS, 0x540_0000, 1, 1);
        mem.write_u64(0x540_0000, lp);
        mem.write_u64(lp + offsets::local_player::PLAYER_CONTROLLER, pc);
        mem.write_u64(pc + offsets::player_controller::ACKNOWLEDGED_PAWN, pawn);

        let wr = reader(mem);
        assert_eq!(wr.local_pawn().unwrap().as_u64(), pawn);
    }

    #[test]
    fn camera_fast_path_revalidates_on_bad_fov() {
        let mem = Arc::new(MockMemory::new());
        seed_world(&mem);
        let gi = 0x500_0000u64;
        let lp = 0x510_0000u64;
        let pc = 0x520_0000u64;
        let mgr = 0x600_0000u64;
        mem.write_u64(WORLD + offsets::world::OWNING_GAME_INSTANCE, gi);
        mem.write_tarray(gi + offsets::game_instance::LOCAL_PLAYERS, 0x540_0000, 1, 1);
        mem.write_u64(0x540_0000, lp);
        mem.write_u64(lp + offsets::local_player::PLAYER_CONTROLLER, pc);
        mem.write_u64(pc + offsets::player_controller::CAMERA_MANAGER, mgr);

        let pov = mgr + offsets::camera_manager::CAMERA_CACHE_PRIVATE + offsets::camera_manager::CACHE_POV;
        for i in 0..6u64 {
            mem.write_f64(pov + i * 8, 0.0);
        }
        mem.write_f32(pov + 48, 90.0);

        let mut wr = reader(Arc::clone(&mem));
        let pose = wr.camera_pose_fast().unwrap();
        assert_eq!(pose.fov, 90.0);

        // The manager moves and the old view goes stale; the fast path must
        // notice the garbage field of view and re-resolve the full chain.
        let mgr2 = 0x610_0000u64;
        mem.write_u64(pc + offsets::player_controller::CAMERA_MANAGER, mgr2);
        let pov2 = mgr2 + offsets::camera_manager::CAMERA_CACHE_PRIVATE + offsets::camera_manager::CACHE_POV;
        for i in 0..6u64 {
            mem.write_f64(pov2 + i * 8, 0.0);
        }
        mem.write_f32(pov2 + 48, 100.0);
        mem.write_f32(pov + 48, -5.0);

        assert_eq!(wr.camera_pose_fast().unwrap().fov, 100.0);
    }
}
