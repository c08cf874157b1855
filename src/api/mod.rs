pub mod openfootball_api;
