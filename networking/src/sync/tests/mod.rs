mod states_tests;
mod sync_state_tests;
