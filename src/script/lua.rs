//! Lua-backed merchant scripts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mlua::{Function, Lua, MultiValue, Result as LuaResult, Value};
use tracing::{debug, warn};

use super::{MerchantScript, ScriptArg, ScriptBinding, ScriptValue};
use crate::error::ScriptError;
use crate::menu::MerchantMenuItem;
use crate::protocol::DialogOption;

/// One loaded script with its own sandboxed VM
pub struct LuaScript {
    name: String,
    lua: Mutex<Lua>,
}

impl LuaScript {
    pub fn load(name: &str, source: &str) -> Result<Self, ScriptError> {
        let lua = sandboxed_lua()?;
        lua.load(source).set_name(name).exec()?;
        Ok(Self {
            name: name.to_string(),
            lua: Mutex::new(lua),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lua(&self) -> MutexGuard<'_, Lua> {
        self.lua.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read a global back out, mostly for tests and diagnostics
    pub fn global_string(&self, name: &str) -> Option<String> {
        self.lua().globals().get::<Option<String>>(name).ok().flatten()
    }

    fn to_lua_args(lua: &Lua, args: &[ScriptArg]) -> LuaResult<MultiValue> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = match arg {
                ScriptArg::User { id, name } => {
                    let table = lua.create_table()?;
                    table.set("id", *id)?;
                    table.set("name", name.as_str())?;
                    table.set("kind", "user")?;
                    Value::Table(table)
                }
                ScriptArg::Object(object) => {
                    let table = lua.create_table()?;
                    table.set("id", object.id)?;
                    table.set("name", object.name.as_str())?;
                    table.set("kind", format!("{:?}", object.kind).to_lowercase())?;
                    Value::Table(table)
                }
                ScriptArg::Number(n) => Value::Integer(*n),
            };
            values.push(value);
        }
        Ok(MultiValue::from_vec(values))
    }

    fn bind(lua: &Lua, binding: ScriptBinding) -> LuaResult<()> {
        let npc = lua.create_table()?;
        npc.set("id", binding.merchant_id)?;
        npc.set("name", binding.merchant_name)?;

        let pursuits = Arc::clone(&binding.pursuits);
        let add_pursuit = lua.create_function(move |_, (text, id): (String, u16)| {
            if !MerchantMenuItem::is_pursuit(id) {
                return Err(mlua::Error::RuntimeError(format!(
                    "pursuit id {:#06x} is reserved for built-in menus",
                    id
                )));
            }
            pursuits
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(DialogOption::new(text, id));
            Ok(())
        })?;
        npc.set("add_pursuit", add_pursuit)?;

        lua.globals().set("npc", npc)
    }
}

fn sandboxed_lua() -> LuaResult<Lua> {
    let lua = Lua::new();
    let globals = lua.globals();

    // Remove dangerous functions
    globals.set("os", Value::Nil)?;
    globals.set("io", Value::Nil)?;
    globals.set("loadfile", Value::Nil)?;
    globals.set("dofile", Value::Nil)?;
    globals.set("require", Value::Nil)?;
    drop(globals);

    Ok(lua)
}

impl MerchantScript for LuaScript {
    fn associate(&self, binding: ScriptBinding) {
        let lua = self.lua();
        if let Err(e) = Self::bind(&lua, binding) {
            warn!("Failed to bind merchant to script {}: {}", self.name, e);
        }
    }

    fn has_function(&self, name: &str) -> bool {
        self.lua().globals().get::<Function>(name).is_ok()
    }

    fn execute_function(&self, name: &str, args: &[ScriptArg]) -> bool {
        let lua = self.lua();
        let function: Function = match lua.globals().get(name) {
            Ok(f) => f,
            Err(_) => {
                debug!("Script {} has no function {}", self.name, name);
                return false;
            }
        };

        let result = Self::to_lua_args(&lua, args).and_then(|args| function.call::<Value>(args));
        match result {
            Ok(Value::Boolean(false)) => false,
            Ok(_) => true,
            Err(e) => {
                warn!("Script {} failed in {}: {}", self.name, name, e);
                false
            }
        }
    }

    fn set_global_value(&self, name: &str, value: ScriptValue) {
        let lua = self.lua();
        let globals = lua.globals();
        let result = match value {
            ScriptValue::Text(text) => globals.set(name, text),
            ScriptValue::Bool(b) => globals.set(name, b),
            ScriptValue::Integer(i) => globals.set(name, i),
        };
        if let Err(e) = result {
            warn!("Script {} rejected global {}: {}", self.name, name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ObjectKind, WorldObject};

    fn binding() -> (ScriptBinding, crate::script::Pursuits) {
        let pursuits: crate::script::Pursuits = Arc::new(Mutex::new(Vec::new()));
        (
            ScriptBinding {
                merchant_id: 7,
                merchant_name: "Riona".into(),
                pursuits: Arc::clone(&pursuits),
            },
            pursuits,
        )
    }

    #[test]
    fn test_sandbox() {
        let script = LuaScript::load("sandbox.lua", "").unwrap();
        let lua = script.lua();
        let os: Value = lua.globals().get("os").unwrap();
        assert!(os.is_nil());
        let io: Value = lua.globals().get("io").unwrap();
        assert!(io.is_nil());
    }

    #[test]
    fn test_spawn_hook_registers_pursuits() {
        let script = LuaScript::load(
            "riona.lua",
            r#"
            function OnSpawn()
                npc.add_pursuit("Tell me a story", 12)
                return true
            end
            "#,
        )
        .unwrap();
        let (binding, pursuits) = binding();
        script.associate(binding);

        assert!(script.has_function("OnSpawn"));
        assert!(!script.has_function("OnClick"));
        assert!(script.execute_function("OnSpawn", &[]));

        let pursuits = pursuits.lock().unwrap();
        assert_eq!(pursuits.as_slice(), &[DialogOption::new("Tell me a story", 12u16)]);
    }

    #[test]
    fn test_failures_report_false() {
        let script = LuaScript::load(
            "broken.lua",
            r#"
            function OnSpawn() error("boom") end
            function Refuse() return false end
            "#,
        )
        .unwrap();
        assert!(!script.execute_function("OnSpawn", &[]));
        assert!(!script.execute_function("Refuse", &[]));
        assert!(!script.execute_function("Missing", &[]));
    }

    #[test]
    fn test_args_and_globals() {
        let script = LuaScript::load(
            "hear.lua",
            r#"
            function OnHear(speaker)
                heard = speaker.name .. ":" .. speaker.kind .. ":" .. text .. ":" .. tostring(shout)
            end
            "#,
        )
        .unwrap();
        script.set_global_value("text", ScriptValue::Text("hello".into()));
        script.set_global_value("shout", ScriptValue::Bool(true));

        let speaker = WorldObject::new(3, "Kedian", ObjectKind::Creature);
        assert!(script.execute_function("OnHear", &[ScriptArg::Object(speaker)]));
        assert_eq!(script.global_string("heard").as_deref(), Some("Kedian:creature:hello:true"));
    }

    #[test]
    fn test_syntax_error_fails_load() {
        assert!(LuaScript::load("bad.lua", "function (").is_err());
    }

    #[test]
    fn test_reserved_pursuit_ids_are_rejected() {
        let script = LuaScript::load(
            "greedy.lua",
            r#"
            function OnSpawn()
                npc.add_pursuit("Buy", 0xFF01)
                return true
            end
            "#,
        )
        .unwrap();
        let (binding, pursuits) = binding();
        script.associate(binding);

        assert!(!script.execute_function("OnSpawn", &[]));
        assert!(pursuits.lock().unwrap().is_empty());
    }
}
