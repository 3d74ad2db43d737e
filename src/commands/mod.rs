pub mod generate_models;
pub mod init;
pub mod load;
pub mod load_datasets;
pub mod load_video_games;
pub mod rawg;
pub mod stats;
