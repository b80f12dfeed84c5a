/// Identity of the signed-in user, used to match participant entries.
pub trait AccountProvider: Send + Sync {
    fn username(&self) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticAccount {
    username: Option<String>,
}

impl StaticAccount {
    pub fn new(username: Option<String>) -> Self {
        Self { username }
    }
}

impl AccountProvider for StaticAccount {
    fn username(&self) -> Option<String> {
        self.username.clone()
    }
}
