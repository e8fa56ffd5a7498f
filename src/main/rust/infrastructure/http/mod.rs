mod front_door;

pub use front_door::HttpFrontDoor;
