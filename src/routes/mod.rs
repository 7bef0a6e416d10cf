pub(crate) mod health;
pub(crate) mod holdings;
pub(crate) mod prices;
pub(crate) mod rollups;
pub(crate) mod tags;
