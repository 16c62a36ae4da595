//! CloudFront Functions attached to the distribution
//!
//! Two functions are managed here: the SPA routing function used when the
//! distribution has no default root object, and the per-domain basic auth
//! function. Functions referenced by name on the command line are only
//! resolved, never written.

use crate::context::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use spaflow_cloud::model::{EdgeFunction, FunctionStage};
use spaflow_cloud::{CloudError, Result, get_all};

/// Rewrites directory requests to their `index.html`.
const ROUTING: &str = r#"  var uri = request.uri;
  if (uri.endsWith('index.html/') || uri.endsWith('index.html')) {
    return request;
  }
  if (!uri.endsWith('/')) {
    return {
      statusCode: 302,
      statusDescription: 'Found',
      headers: { location: { value: uri + '/' } },
    };
  }
  request.uri = uri + 'index.html';
"#;

pub const REDIRECT_FUNCTION_COMMENT: &str =
    "Redirects to branch specific index.html when no default root object is set";

/// `user:pass` credentials protecting the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl BasicAuth {
    pub fn parse(credentials: &str) -> Result<Self> {
        match credentials.split_once(':') {
            Some((user, password)) if !user.is_empty() && !password.is_empty() => Ok(Self {
                user: user.to_string(),
                password: password.to_string(),
            }),
            _ => Err(CloudError::precondition(
                "credentials must be given as \"user:password\"",
            )),
        }
    }

    /// Expected `authorization` header value
    pub fn header_value(&self) -> String {
        format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", self.user, self.password))
        )
    }
}

/// Code of the SPA routing function.
pub fn redirect_function_code() -> String {
    format!(
        "function handler(event) {{\n  var request = event.request;\n{ROUTING}  return request;\n}}\n"
    )
}

/// Code of the basic auth function, optionally followed by the SPA routing.
pub fn basic_auth_function_code(auth: &BasicAuth, spa_routing: bool) -> String {
    let mut code = String::from("function handler(event) {\n  var request = event.request;\n");
    code.push_str("  var headers = request.headers;\n");
    code.push_str(&format!("  var expected = '{}';\n", auth.header_value()));
    code.push_str(
        r#"  if (!headers.authorization || headers.authorization.value !== expected) {
    return {
      statusCode: 401,
      statusDescription: 'Unauthorized',
      headers: { 'www-authenticate': { value: 'Basic' } },
    };
  }
"#,
    );
    if spa_routing {
        code.push_str(ROUTING);
    }
    code.push_str("  return request;\n}\n");
    code
}

pub struct EdgeFunctionManager<'a> {
    ctx: &'a Context,
}

impl<'a> EdgeFunctionManager<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Most recently modified LIVE function with that name.
    pub async fn find_live(&self, name: &str) -> Result<Option<EdgeFunction>> {
        let functions = get_all(|marker, page| {
            tracing::debug!("[CloudFront] list functions (page {})", page);
            self.ctx.functions.list_functions(marker)
        })
        .await?;

        Ok(functions
            .into_iter()
            .filter(|f| f.name == name && f.stage == FunctionStage::Live)
            .fold(None, |best: Option<EdgeFunction>, f| match best {
                Some(current) if current.last_modified >= f.last_modified => Some(current),
                _ => Some(f),
            }))
    }

    /// ARN of the published function with that name.
    pub async fn resolve_live_arn(&self, name: &str) -> Result<Option<String>> {
        Ok(self.find_live(name).await?.map(|f| f.arn))
    }

    /// Make sure a function exists and is published; returns its ARN.
    ///
    /// An existing LIVE function is used as is. A function only present in
    /// DEVELOPMENT is published; otherwise it is created first.
    pub async fn ensure_published(&self, name: &str, code: &str, comment: &str) -> Result<String> {
        if let Some(live) = self.find_live(name).await? {
            tracing::info!("[CloudFront] 👍 function {} is published", name);
            return Ok(live.arn);
        }

        let development = match self.find_development(name).await? {
            Some(function) => function,
            None => self.create(name, code, comment).await?,
        };
        self.publish(&development).await
    }

    /// Like [`ensure_published`](Self::ensure_published), but also rewrites
    /// the function when its code differs from `code`.
    pub async fn ensure_code(&self, name: &str, code: &str, comment: &str) -> Result<String> {
        let Some(mut development) = self.find_development(name).await? else {
            let created = self.create(name, code, comment).await?;
            return self.publish(&created).await;
        };

        let current = self
            .ctx
            .functions
            .get_function_code(name, FunctionStage::Development)
            .await?;

        if current == code {
            if let Some(live) = self.find_live(name).await? {
                tracing::info!("[CloudFront] 👍 function {} is up to date", name);
                return Ok(live.arn);
            }
        } else {
            tracing::info!("[CloudFront] ✏️ updating function {}...", name);
            let etag = development.etag.as_deref().ok_or_else(|| missing_etag(name))?;
            let new_etag = self
                .ctx
                .functions
                .update_function(name, etag, comment, code)
                .await?;
            development.etag = Some(new_etag);
        }

        self.publish(&development).await
    }

    async fn find_development(&self, name: &str) -> Result<Option<EdgeFunction>> {
        match self
            .ctx
            .functions
            .describe_function(name, FunctionStage::Development)
            .await
        {
            Ok(function) => Ok(Some(function)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, name: &str, code: &str, comment: &str) -> Result<EdgeFunction> {
        tracing::info!("[CloudFront] ✏️ creating function {}...", name);
        self.ctx.functions.create_function(name, comment, code).await
    }

    async fn publish(&self, function: &EdgeFunction) -> Result<String> {
        tracing::info!("[CloudFront] ✏️ publishing function {}...", function.name);
        let etag = function
            .etag
            .as_deref()
            .ok_or_else(|| missing_etag(&function.name))?;
        let published = self
            .ctx
            .functions
            .publish_function(&function.name, etag)
            .await?;

        if published.arn.is_empty() {
            Ok(function.arn.clone())
        } else {
            Ok(published.arn)
        }
    }
}

fn missing_etag(name: &str) -> CloudError {
    CloudError::precondition(format!("[CloudFront] no ETag returned for function {name}"))
}
