//! Built-in file templates
//!
//! A small library of starter bodies keyed by template id. Anything not in
//! the table renders the `basic` placeholder, which records the file name,
//! type and requested template.

use crate::context::ContentProvider;
use std::path::Path;

const FASTAPI_MAIN: &str = r#"from fastapi import FastAPI

app = FastAPI(title="API Service")

@app.get("/")
async def root():
    return {"message": "Hello World"}

if __name__ == "__main__":
    import uvicorn
    uvicorn.run(app, host="0.0.0.0", port=8000)
"#;

const FASTAPI_MODEL: &str = r#"from pydantic import BaseModel
from typing import Optional

class BaseModel(BaseModel):
    class Config:
        from_attributes = True
"#;

const FASTAPI_ROUTER: &str = r#"from fastapi import APIRouter

router = APIRouter()

@router.get("/health")
async def health_check():
    return {"status": "healthy"}
"#;

const REQUIREMENTS: &str = "fastapi>=0.68.0
uvicorn>=0.15.0
pydantic>=1.8.0
";

const JWT_AUTH: &str = r#"import jwt
from datetime import datetime, timedelta
from typing import Optional

SECRET_KEY = "change-me"  # read from the environment in production
ALGORITHM = "HS256"

def create_access_token(data: dict, expires_delta: Optional[timedelta] = None):
    to_encode = data.copy()
    if expires_delta:
        expire = datetime.utcnow() + expires_delta
    else:
        expire = datetime.utcnow() + timedelta(minutes=15)
    to_encode.update({"exp": expire})
    return jwt.encode(to_encode, SECRET_KEY, algorithm=ALGORITHM)
"#;

const AUTH_MIDDLEWARE: &str = r#"from fastapi import Request, HTTPException
from fastapi.security import HTTPBearer, HTTPAuthorizationCredentials

security = HTTPBearer()

async def verify_token(credentials: HTTPAuthorizationCredentials = security):
    if not credentials:
        raise HTTPException(status_code=401, detail="Invalid token")
    return credentials.credentials
"#;

const PYTEST_MAIN: &str = r#"import pytest
from fastapi.testclient import TestClient

def test_health_check():
    assert True
"#;

const PYTEST_CONFTEST: &str = r#"import pytest
from fastapi.testclient import TestClient

@pytest.fixture
def client():
    pass
"#;

const DOTNET_PROGRAM: &str = r#"using Microsoft.AspNetCore.Builder;
using Microsoft.Extensions.DependencyInjection;
using Microsoft.Extensions.Hosting;
using Microsoft.OpenApi.Models;

var builder = WebApplication.CreateBuilder(args);

builder.Services.AddControllers();
builder.Services.AddEndpointsApiExplorer();
builder.Services.AddSwaggerGen(c =>
{
    c.SwaggerDoc("v1", new OpenApiInfo { Title = "API Service", Version = "v1" });
});

var app = builder.Build();

if (app.Environment.IsDevelopment())
{
    app.UseSwagger();
    app.UseSwaggerUI();
}

app.UseHttpsRedirection();
app.UseAuthorization();
app.MapControllers();

app.Run();
"#;

const DOTNET_CONTROLLER: &str = r#"using Microsoft.AspNetCore.Mvc;

namespace API.Controllers;

[ApiController]
[Route("api/[controller]")]
public class BaseController : ControllerBase
{
    [HttpGet]
    public IActionResult Get()
    {
        return Ok(new { message = "Hello from API" });
    }
}
"#;

const EF_DBCONTEXT: &str = r#"using Microsoft.EntityFrameworkCore;

namespace API.Models;

public class AppDbContext : DbContext
{
    public AppDbContext(DbContextOptions<AppDbContext> options) : base(options)
    {
    }
}
"#;

const DOTNET_SERVICE: &str = r#"namespace API.Services;

public interface IAuthService
{
    Task<bool> ValidateUserAsync(string username, string password);
    Task<string> GenerateTokenAsync(string username);
}

public class AuthService : IAuthService
{
    public async Task<bool> ValidateUserAsync(string username, string password)
    {
        return await Task.FromResult(true);
    }

    public async Task<string> GenerateTokenAsync(string username)
    {
        return await Task.FromResult("sample-token");
    }
}
"#;

const DOTNET_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk.Web">

  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
    <Nullable>enable</Nullable>
    <ImplicitUsings>enable</ImplicitUsings>
  </PropertyGroup>

  <ItemGroup>
    <PackageReference Include="Microsoft.AspNetCore.Authentication.JwtBearer" Version="8.0.0" />
    <PackageReference Include="Microsoft.EntityFrameworkCore.SqlServer" Version="8.0.0" />
    <PackageReference Include="Swashbuckle.AspNetCore" Version="6.5.0" />
  </ItemGroup>

</Project>
"#;

/// Template ids with a dedicated body
pub const TEMPLATE_IDS: &[&str] = &[
    "fastapi_main",
    "fastapi_model",
    "fastapi_router",
    "requirements",
    "jwt_auth",
    "auth_middleware",
    "pytest_main",
    "pytest_conftest",
    "dotnet_program",
    "dotnet_controller",
    "ef_dbcontext",
    "dotnet_service",
    "dotnet_csproj",
];

/// The built-in template table
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    /// Body for a known template id
    pub fn lookup(template: &str) -> Option<&'static str> {
        let body = match template {
            "fastapi_main" => FASTAPI_MAIN,
            "fastapi_model" => FASTAPI_MODEL,
            "fastapi_router" => FASTAPI_ROUTER,
            "requirements" => REQUIREMENTS,
            "jwt_auth" => JWT_AUTH,
            "auth_middleware" => AUTH_MIDDLEWARE,
            "pytest_main" => PYTEST_MAIN,
            "pytest_conftest" => PYTEST_CONFTEST,
            "dotnet_program" => DOTNET_PROGRAM,
            "dotnet_controller" => DOTNET_CONTROLLER,
            "ef_dbcontext" => EF_DBCONTEXT,
            "dotnet_service" => DOTNET_SERVICE,
            "dotnet_csproj" => DOTNET_CSPROJ,
            _ => return None,
        };
        Some(body)
    }

    /// Placeholder body for templates without a dedicated entry
    pub fn basic(path: &str, file_type: &str, template: &str) -> String {
        let file_name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        format!(
            "# {file_name}\n\
             # Generated by devplan\n\
             # File type: {file_type}\n\
             # Template: {template}\n\
             \n\
             # Implement {file_type} functionality here\n"
        )
    }
}

impl ContentProvider for BuiltinTemplates {
    fn generate_content(&self, path: &str, file_type: &str, template: &str) -> String {
        match Self::lookup(template) {
            Some(body) => body.to_string(),
            None => Self::basic(path, file_type, template),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_id_has_a_body() {
        for id in TEMPLATE_IDS {
            assert!(BuiltinTemplates::lookup(id).is_some(), "missing body for {id}");
        }
    }

    #[test]
    fn test_known_template() {
        let content = BuiltinTemplates.generate_content("requirements.txt", "deps", "requirements");
        assert!(content.contains("fastapi>="));
    }

    #[test]
    fn test_unknown_template_falls_back_to_basic() {
        let content = BuiltinTemplates.generate_content("src/app/config.yaml", "config", "nope");
        assert!(content.starts_with("# config.yaml\n"));
        assert!(content.contains("# File type: config"));
        assert!(content.contains("# Template: nope"));
    }
}
