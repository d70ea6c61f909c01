pub mod config;

pub mod shared {
    pub mod core {
        pub mod cancellation;
    }
    pub mod infrastructure {
        pub mod event_log;
    }
}

pub mod modules {
    pub mod recorded_events {
        pub mod core {
            pub mod deadline;
            pub mod event_record;
            pub mod predicate;
            pub mod query_state;
            pub mod tally;
        }
        pub mod use_cases {
            pub mod record_event {
                pub mod cloud_event;
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod wait_for_match {
                pub mod handler;
                pub mod query;
            }
            pub mod list_recorded_events {
                pub mod inbound {
                    pub mod http;
                }
            }
        }
    }
}

pub mod shell;
