use cucumber::given;
use pointboard_engine::helpers::DEFAULT_ORDER_PREFIX;

use crate::cucumber::{world::ShopSystem, PointBoardWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut PointBoardWorld) {
    world.system = Some(ShopSystem::new(DEFAULT_ORDER_PREFIX).await);
}

#[given(expr = "a fresh install with order prefix {word}")]
async fn fresh_database_with_prefix(world: &mut PointBoardWorld, prefix: String) {
    world.system = Some(ShopSystem::new(&prefix).await);
}
