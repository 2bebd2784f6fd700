use crate::agent::AgentId;
use crate::config::SimConfig;
use crate::spatial::Torus;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Regular food categories. Golden food is spawned out-of-band and carries no tier roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodTier {
    Common,
    Uncommon,
    Rare,
    Epic,
}

impl FoodTier {
    pub const ALL: [FoodTier; 4] = [
        FoodTier::Common,
        FoodTier::Uncommon,
        FoodTier::Rare,
        FoodTier::Epic,
    ];

    pub const fn spawn_chance(self) -> f64 {
        match self {
            FoodTier::Common => 0.60,
            FoodTier::Uncommon => 0.25,
            FoodTier::Rare => 0.12,
            FoodTier::Epic => 0.03,
        }
    }

    pub const fn energy(self) -> f32 {
        match self {
            FoodTier::Common => 10.0,
            FoodTier::Uncommon => 20.0,
            FoodTier::Rare => 35.0,
            FoodTier::Epic => 50.0,
        }
    }

    /// Draw a tier according to the spawn-chance distribution.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut r = rng.random::<f64>();
        for tier in Self::ALL {
            if r < tier.spawn_chance() {
                return tier;
            }
            r -= tier.spawn_chance();
        }
        // Floating residue of the cumulative walk lands on the last tier.
        FoodTier::Epic
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Food {
    pub position: [f64; 2],
    pub active: bool,
    /// Collector pulling this item. Resolved through the agent store before every use.
    pub owner: Option<AgentId>,
    pub size: f64,
    pub tier: FoodTier,
    pub golden: bool,
}

impl Food {
    fn fresh<R: Rng + ?Sized>(rng: &mut R, torus: &Torus, size: f64) -> Self {
        Self {
            position: random_position(rng, torus),
            active: true,
            owner: None,
            size,
            tier: FoodTier::roll(rng),
            golden: false,
        }
    }

    fn golden<R: Rng + ?Sized>(rng: &mut R, torus: &Torus, size: f64) -> Self {
        Self {
            position: random_position(rng, torus),
            active: true,
            owner: None,
            size: size * 1.5,
            tier: FoodTier::Epic,
            golden: true,
        }
    }

    pub fn is_being_pulled(&self) -> bool {
        self.owner.is_some()
    }

    /// Free for a detection beam to claim.
    pub fn is_claimable(&self) -> bool {
        self.active && self.owner.is_none()
    }

    pub fn energy(&self, config: &SimConfig) -> f32 {
        if self.golden {
            config.golden_food_energy
        } else {
            self.tier.energy()
        }
    }
}

fn random_position<R: Rng + ?Sized>(rng: &mut R, torus: &Torus) -> [f64; 2] {
    [
        rng.random::<f64>() * torus.width,
        rng.random::<f64>() * torus.height,
    ]
}

/// Food pool: a fixed base pool reset in place on consumption, plus temporary golden slots.
#[derive(Clone, Debug)]
pub struct FoodStore {
    items: Vec<Food>,
    base_pool: usize,
}

impl FoodStore {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, torus: &Torus, config: &SimConfig) -> Self {
        let items = (0..config.food_pool_size)
            .map(|_| Food::fresh(rng, torus, config.food_size))
            .collect();
        Self {
            items,
            base_pool: config.food_pool_size,
        }
    }

    pub fn from_items(items: Vec<Food>, base_pool: usize) -> Self {
        Self { items, base_pool }
    }

    pub fn items(&self) -> &[Food] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Food] {
        &mut self.items
    }

    pub fn get(&self, index: usize) -> Option<&Food> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn base_pool(&self) -> usize {
        self.base_pool
    }

    pub fn active_count(&self) -> usize {
        self.items.iter().filter(|f| f.active).count()
    }

    pub fn active_golden_count(&self) -> usize {
        self.items.iter().filter(|f| f.active && f.golden).count()
    }

    /// Bind an unclaimed item to `owner`. Returns false if the item was not claimable.
    pub fn claim(&mut self, index: usize, owner: AgentId) -> bool {
        match self.items.get_mut(index) {
            Some(food) if food.is_claimable() => {
                food.owner = Some(owner);
                true
            }
            _ => false,
        }
    }

    /// Release every item pulled by `owner`. Returns how many were released.
    pub fn release_owner(&mut self, owner: AgentId) -> usize {
        let mut released = 0;
        for food in self.items.iter_mut().filter(|f| f.owner == Some(owner)) {
            food.owner = None;
            released += 1;
        }
        released
    }

    /// Retire a consumed item: base-pool slots respawn in place with a fresh tier and position,
    /// slots beyond the base pool go inactive and are pruned later.
    pub fn retire<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        rng: &mut R,
        torus: &Torus,
        config: &SimConfig,
    ) {
        let base_pool = self.base_pool;
        let Some(food) = self.items.get_mut(index) else {
            return;
        };
        if index < base_pool {
            *food = Food::fresh(rng, torus, config.food_size);
        } else {
            food.active = false;
            food.golden = false;
            food.owner = None;
        }
    }

    /// Place a golden item in the first inactive slot, appending one if none is free.
    /// Returns the slot index, or `None` when the golden cap is reached.
    pub fn spawn_golden<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        torus: &Torus,
        config: &SimConfig,
    ) -> Option<usize> {
        if self.active_golden_count() >= config.max_golden_food {
            return None;
        }
        let golden = Food::golden(rng, torus, config.food_size);
        match self.items.iter().position(|f| !f.active) {
            Some(index) => {
                self.items[index] = golden;
                Some(index)
            }
            None => {
                self.items.push(golden);
                Some(self.items.len() - 1)
            }
        }
    }

    /// Drop inactive, non-golden items beyond the base pool.
    pub fn prune(&mut self) -> usize {
        let before = self.items.len();
        let base_pool = self.base_pool;
        let mut index = 0;
        self.items.retain(|f| {
            let keep = index < base_pool || f.active || f.golden;
            index += 1;
            keep
        });
        before - self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use slotmap::SlotMap;

    fn setup(pool: usize) -> (FoodStore, Torus, SimConfig) {
        let config = SimConfig {
            food_pool_size: pool,
            ..SimConfig::default()
        };
        let torus = Torus::new(config.world_width, config.world_height);
        let store = FoodStore::new(&mut create_rng(1), &torus, &config);
        (store, torus, config)
    }

    #[test]
    fn tier_chances_sum_to_one() {
        let total: f64 = FoodTier::ALL.iter().map(|t| t.spawn_chance()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tier_roll_matches_distribution() {
        let mut rng = create_rng(99);
        let samples = 200_000;
        let mut counts = [0usize; 4];
        for _ in 0..samples {
            let tier = FoodTier::roll(&mut rng);
            let idx = FoodTier::ALL.iter().position(|t| *t == tier).unwrap();
            counts[idx] += 1;
        }
        for (tier, count) in FoodTier::ALL.iter().zip(counts) {
            let observed = count as f64 / samples as f64;
            assert!(
                (observed - tier.spawn_chance()).abs() < 0.01,
                "{tier:?}: observed {observed}, expected {}",
                tier.spawn_chance()
            );
        }
    }

    #[test]
    fn new_store_fills_base_pool_in_bounds() {
        let (store, torus, _) = setup(25);
        assert_eq!(store.len(), 25);
        assert_eq!(store.active_count(), 25);
        for food in store.items() {
            assert!(food.position[0] < torus.width && food.position[1] < torus.height);
            assert!(!food.golden && !food.is_being_pulled());
        }
    }

    #[test]
    fn claim_binds_only_once_and_release_frees() {
        let (mut store, _, _) = setup(3);
        let mut ids: SlotMap<AgentId, ()> = SlotMap::with_key();
        let a = ids.insert(());
        let b = ids.insert(());
        assert!(store.claim(0, a));
        assert!(!store.claim(0, b));
        assert!(store.claim(1, a));
        assert_eq!(store.release_owner(a), 2);
        assert!(store.items().iter().all(|f| f.owner.is_none()));
    }

    #[test]
    fn golden_reuses_inactive_slot_before_appending() {
        let (mut store, torus, config) = setup(2);
        let mut rng = create_rng(5);
        let appended = store.spawn_golden(&mut rng, &torus, &config).unwrap();
        assert_eq!(appended, 2);
        store.retire(appended, &mut rng, &torus, &config);
        assert!(!store.items()[2].active);
        let reused = store.spawn_golden(&mut rng, &torus, &config).unwrap();
        assert_eq!(reused, 2);
        assert!(store.items()[2].golden);
    }

    #[test]
    fn golden_respects_cap() {
        let (mut store, torus, mut config) = setup(1);
        config.max_golden_food = 1;
        let mut rng = create_rng(5);
        assert!(store.spawn_golden(&mut rng, &torus, &config).is_some());
        assert!(store.spawn_golden(&mut rng, &torus, &config).is_none());
        assert_eq!(store.active_golden_count(), 1);
    }

    #[test]
    fn retire_respawns_base_pool_in_place() {
        let (mut store, torus, config) = setup(1);
        let mut rng = create_rng(8);
        let mut ids: SlotMap<AgentId, ()> = SlotMap::with_key();
        store.claim(0, ids.insert(()));
        store.items_mut()[0].size = 1.0;
        store.retire(0, &mut rng, &torus, &config);
        let food = &store.items()[0];
        assert!(food.active && !food.is_being_pulled());
        assert_eq!(food.size, config.food_size);
    }

    #[test]
    fn prune_only_drops_extra_inactive_regular_slots() {
        let (mut store, torus, config) = setup(2);
        let mut rng = create_rng(5);
        let first = store.spawn_golden(&mut rng, &torus, &config).unwrap();
        store.spawn_golden(&mut rng, &torus, &config).unwrap();
        store.retire(first, &mut rng, &torus, &config);
        store.items_mut()[0].active = false;
        assert_eq!(store.prune(), 1);
        assert_eq!(store.len(), 3);
        assert!(store.items()[2].golden);
        assert!(!store.items()[0].active);
    }
}
