use std::sync::Arc;
use use_cases::registration::RegistrationInteractor;

pub struct Application {
    pub registration: Arc<dyn RegistrationInteractor>,
}

impl Application {
    pub fn new(registration: Arc<dyn RegistrationInteractor>) -> Self {
        Application { registration }
    }
}
