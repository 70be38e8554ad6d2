use restguard::authz::types::{HttpVerb, MethodDescriptor, ResourceHandlerDescriptor};

/// Builder for handler descriptors
pub struct HandlerBuilder {
    name: String,
    base_path: String,
    methods: Vec<MethodDescriptor>,
}

impl HandlerBuilder {
    pub fn new(base_path: &str) -> Self {
        Self {
            name: format!("handler{base_path}"),
            base_path: base_path.to_string(),
            methods: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method.build());
        self
    }

    pub fn build(self) -> ResourceHandlerDescriptor {
        ResourceHandlerDescriptor {
            name: self.name,
            base_path: self.base_path,
            methods: self.methods,
        }
    }
}

/// Builder for handler methods
pub struct MethodBuilder {
    name: String,
    path: String,
    verb: Option<HttpVerb>,
    roles: Vec<String>,
    permissions: Vec<String>,
}

impl MethodBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: String::new(),
            verb: None,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn get(name: &str, path: &str) -> Self {
        Self::new(name).verb(HttpVerb::Get).path(path)
    }

    pub fn post(name: &str, path: &str) -> Self {
        Self::new(name).verb(HttpVerb::Post).path(path)
    }

    pub fn put(name: &str, path: &str) -> Self {
        Self::new(name).verb(HttpVerb::Put).path(path)
    }

    pub fn delete(name: &str, path: &str) -> Self {
        Self::new(name).verb(HttpVerb::Delete).path(path)
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn verb(mut self, verb: HttpVerb) -> Self {
        self.verb = Some(verb);
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.roles.extend(roles.iter().map(|r| r.to_string()));
        self
    }

    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions
            .extend(permissions.iter().map(|p| p.to_string()));
        self
    }

    pub fn build(self) -> MethodDescriptor {
        MethodDescriptor {
            name: self.name,
            path: self.path,
            verb: self.verb,
            roles: self.roles,
            permissions: self.permissions,
        }
    }
}
