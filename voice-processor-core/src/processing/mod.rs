pub mod input_queue;
